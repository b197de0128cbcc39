//! Mock platform for host-side tests.
//!
//! Every mock is thread-safe and records what the kernel asked of it, so a
//! test can drive parent and child contexts from separate threads and then
//! inspect storage, scheduler and console state.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::{KernelConfig, UnknownRequest};
use crate::exception::TrapFrame;
use crate::fs::Storage;
use crate::kernel::{Console, Kernel, Platform};
use crate::mm::{PageAccess, UserAddr, UserMemory, PAGE_SIZE, WORD_SIZE};
use crate::proc::{Scheduler, Semaphore, Tid};
use crate::syscall::Disposition;

/// One stack page directly below the default split.
pub const STACK: usize = 0xBFFF_F000;
/// Start of the read/write data region mapped by `boot`.
pub const DATA: usize = 0x0804_8000;
/// Pages mapped at `DATA`.
pub const DATA_PAGES: usize = 8;
/// Result-slot sentinel: a frame still holding it was never written.
pub const UNTOUCHED: usize = 0x5a5a_5a5a;

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

struct Page {
    access: PageAccess,
    bytes: Box<[u8; PAGE_SIZE]>,
}

/// Paged user memory, one sparse address space per `Tid`.
pub struct MockMemory {
    pages: Mutex<BTreeMap<(Tid, usize), Page>>,
}

impl MockMemory {
    pub fn new() -> Self {
        Self {
            pages: Mutex::new(BTreeMap::new()),
        }
    }

    /// Map every page touching `[addr, addr + len)` with `access`. Pages
    /// already mapped keep their contents.
    pub fn map(&self, tid: Tid, addr: usize, len: usize, access: PageAccess) {
        let first = addr / PAGE_SIZE;
        let last = (addr + len.max(1) - 1) / PAGE_SIZE;
        let mut pages = self.pages.lock().unwrap();
        for page in first..=last {
            pages
                .entry((tid, page))
                .and_modify(|p| p.access = access)
                .or_insert_with(|| Page {
                    access,
                    bytes: Box::new([0; PAGE_SIZE]),
                });
        }
    }

    /// Store bytes regardless of access bits. Panics on an unmapped page.
    pub fn poke(&self, tid: Tid, addr: usize, bytes: &[u8]) {
        let mut pages = self.pages.lock().unwrap();
        for (i, &byte) in bytes.iter().enumerate() {
            let a = addr + i;
            let page = pages
                .get_mut(&(tid, a / PAGE_SIZE))
                .unwrap_or_else(|| panic!("poke into unmapped {:#x}", a));
            page.bytes[a % PAGE_SIZE] = byte;
        }
    }

    /// Load bytes regardless of access bits. Panics on an unmapped page.
    pub fn peek(&self, tid: Tid, addr: usize, len: usize) -> Vec<u8> {
        let pages = self.pages.lock().unwrap();
        (addr..addr + len)
            .map(|a| {
                pages
                    .get(&(tid, a / PAGE_SIZE))
                    .unwrap_or_else(|| panic!("peek at unmapped {:#x}", a))
                    .bytes[a % PAGE_SIZE]
            })
            .collect()
    }
}

impl UserMemory for MockMemory {
    fn access(&self, space: Tid, addr: UserAddr) -> PageAccess {
        self.pages
            .lock()
            .unwrap()
            .get(&(space, addr.as_usize() / PAGE_SIZE))
            .map_or(PageAccess::empty(), |p| p.access)
    }

    fn read_byte(&self, space: Tid, addr: UserAddr) -> Option<u8> {
        let pages = self.pages.lock().unwrap();
        let page = pages.get(&(space, addr.as_usize() / PAGE_SIZE))?;
        page.access
            .contains(PageAccess::READ)
            .then(|| page.bytes[addr.as_usize() % PAGE_SIZE])
    }

    fn write_byte(&self, space: Tid, addr: UserAddr, byte: u8) -> bool {
        let mut pages = self.pages.lock().unwrap();
        match pages.get_mut(&(space, addr.as_usize() / PAGE_SIZE)) {
            Some(page) if page.access.contains(PageAccess::WRITE) => {
                page.bytes[addr.as_usize() % PAGE_SIZE] = byte;
                true
            }
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

type Contents = Arc<Mutex<Vec<u8>>>;

/// An open handle. Survives removal of its name, as on disk.
pub struct MockFile {
    data: Contents,
    pos: u32,
}

/// In-memory flat file system. `create` reserves its initial size; a
/// file's length is the extent actually written.
#[derive(Default)]
pub struct MockStorage {
    files: BTreeMap<String, Contents>,
    calls: usize,
    open: usize,
}

impl MockStorage {
    /// Storage holding one empty file per name.
    pub fn with_files(names: &[&str]) -> Self {
        let mut storage = Self::default();
        for name in names {
            storage.install(name, &[]);
        }
        storage
    }

    /// Create or replace `name` with `contents`. Not counted as a call.
    pub fn install(&mut self, name: &str, contents: &[u8]) {
        self.files
            .insert(name.into(), Arc::new(Mutex::new(contents.to_vec())));
    }

    pub fn exists(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    /// Number of `Storage` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Handles opened and not yet closed.
    pub fn open_handles(&self) -> usize {
        self.open
    }
}

impl Storage for MockStorage {
    type File = MockFile;

    fn create(&mut self, name: &str, initial_size: u32) -> bool {
        self.calls += 1;
        if name.is_empty() || self.exists(name) {
            return false;
        }
        let contents = Vec::with_capacity(initial_size as usize);
        self.files.insert(name.into(), Arc::new(Mutex::new(contents)));
        true
    }

    fn remove(&mut self, name: &str) -> bool {
        self.calls += 1;
        self.files.remove(name).is_some()
    }

    fn open(&mut self, name: &str) -> Option<MockFile> {
        self.calls += 1;
        let data = self.files.get(name)?.clone();
        self.open += 1;
        Some(MockFile { data, pos: 0 })
    }

    fn close(&mut self, _file: MockFile) {
        self.calls += 1;
        self.open -= 1;
    }

    fn read(&mut self, file: &mut MockFile, dst: &mut [u8]) -> usize {
        self.calls += 1;
        let data = file.data.lock().unwrap();
        let start = (file.pos as usize).min(data.len());
        let n = dst.len().min(data.len() - start);
        dst[..n].copy_from_slice(&data[start..start + n]);
        file.pos += n as u32;
        n
    }

    fn write(&mut self, file: &mut MockFile, src: &[u8]) -> usize {
        self.calls += 1;
        let mut data = file.data.lock().unwrap();
        let start = file.pos as usize;
        if data.len() < start + src.len() {
            data.resize(start + src.len(), 0);
        }
        data[start..start + src.len()].copy_from_slice(src);
        file.pos += src.len() as u32;
        src.len()
    }

    fn seek(&mut self, file: &mut MockFile, pos: u32) {
        self.calls += 1;
        file.pos = pos;
    }

    fn tell(&mut self, file: &MockFile) -> u32 {
        self.calls += 1;
        file.pos
    }

    fn length(&mut self, file: &MockFile) -> u32 {
        self.calls += 1;
        file.data.lock().unwrap().len() as u32
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Counting semaphore.
pub struct MockSemaphore {
    count: Mutex<u32>,
    cond: Condvar,
}

impl Semaphore for MockSemaphore {
    fn down(&self) {
        let mut count = self.count.lock().unwrap();
        while *count == 0 {
            count = self.cond.wait(count).unwrap();
        }
        *count -= 1;
    }

    fn up(&self) {
        *self.count.lock().unwrap() += 1;
        self.cond.notify_one();
    }
}

/// A context creation the kernel requested. The test plays the loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launch {
    pub tid: Tid,
    pub parent: Tid,
    pub cmdline: String,
}

pub struct MockScheduler {
    next: AtomicU32,
    current: AtomicU32,
    refuse: AtomicBool,
    launches: Mutex<VecDeque<Launch>>,
    spawned: AtomicUsize,
    terminated: Mutex<Vec<Tid>>,
    shutdowns: AtomicUsize,
}

impl MockScheduler {
    pub fn new() -> Self {
        Self {
            next: AtomicU32::new(100),
            current: AtomicU32::new(1),
            refuse: AtomicBool::new(false),
            launches: Mutex::new(VecDeque::new()),
            spawned: AtomicUsize::new(0),
            terminated: Mutex::new(Vec::new()),
            shutdowns: AtomicUsize::new(0),
        }
    }

    /// Block until the kernel asks for a new context.
    pub fn wait_launch(&self) -> Launch {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(launch) = self.launches.lock().unwrap().pop_front() {
                return launch;
            }
            assert!(Instant::now() < deadline, "no launch requested");
            thread::sleep(Duration::from_millis(1));
        }
    }

    pub fn refuse_spawns(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn set_current(&self, tid: Tid) {
        self.current.store(tid.raw(), Ordering::SeqCst);
    }

    pub fn spawned(&self) -> usize {
        self.spawned.load(Ordering::SeqCst)
    }

    pub fn terminated(&self) -> Vec<Tid> {
        self.terminated.lock().unwrap().clone()
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

impl Scheduler for MockScheduler {
    type Semaphore = MockSemaphore;

    fn current(&self) -> Tid {
        Tid::new(self.current.load(Ordering::SeqCst))
    }

    fn spawn_process(&self, parent: Tid, cmdline: &str) -> Option<Tid> {
        if self.refuse.load(Ordering::SeqCst) {
            return None;
        }
        let tid = Tid::new(self.next.fetch_add(1, Ordering::SeqCst));
        self.spawned.fetch_add(1, Ordering::SeqCst);
        self.launches.lock().unwrap().push_back(Launch {
            tid,
            parent,
            cmdline: cmdline.into(),
        });
        Some(tid)
    }

    fn semaphore(&self) -> MockSemaphore {
        MockSemaphore {
            count: Mutex::new(0),
            cond: Condvar::new(),
        }
    }

    fn terminate(&self, tid: Tid) {
        self.terminated.lock().unwrap().push(tid);
    }

    fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Console
// ---------------------------------------------------------------------------

pub struct MockConsole {
    out: Mutex<Vec<u8>>,
}

impl MockConsole {
    pub fn new() -> Self {
        Self {
            out: Mutex::new(Vec::new()),
        }
    }

    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.out.lock().unwrap()).into_owned()
    }
}

impl Console for MockConsole {
    fn write_bytes(&self, bytes: &[u8]) {
        self.out.lock().unwrap().extend_from_slice(bytes);
    }
}

// ---------------------------------------------------------------------------
// Kernel harness
// ---------------------------------------------------------------------------

pub struct MockPlatform;

impl Platform for MockPlatform {
    type Storage = MockStorage;
    type Memory = MockMemory;
    type Scheduler = MockScheduler;
    type Console = MockConsole;
}

pub type TestKernel = Kernel<MockPlatform>;

/// Kernel with default settings, unknown requests ignored.
pub fn kernel() -> TestKernel {
    kernel_with(KernelConfig::DEFAULT.with_unknown_request(UnknownRequest::Ignore))
}

pub fn kernel_with(config: KernelConfig) -> TestKernel {
    Kernel::new(
        config,
        MockStorage::default(),
        MockMemory::new(),
        MockScheduler::new(),
        MockConsole::new(),
    )
}

/// Act as the loader for `tid`: map its stack and data, open an executable
/// called `name`, and register the context.
pub fn boot(kernel: &TestKernel, tid: Tid, parent: Option<Tid>, name: &str) {
    kernel.memory().map(tid, STACK, PAGE_SIZE, PageAccess::all());
    kernel
        .memory()
        .map(tid, DATA, DATA_PAGES * PAGE_SIZE, PageAccess::all());
    let executable = {
        let mut storage = kernel.filesystem().lock();
        if !storage.exists(name) {
            storage.install(name, b"\x7fELF");
        }
        storage.open(name)
    };
    assert!(kernel.start_process(tid, parent, name, executable));
}

/// Store `s` and its terminator at `addr`.
pub fn put_str(kernel: &TestKernel, tid: Tid, addr: usize, s: &str) {
    kernel.memory().poke(tid, addr, s.as_bytes());
    kernel.memory().poke(tid, addr + s.len(), &[0]);
}

/// A frame whose result slot holds `UNTOUCHED`.
pub fn frame(sp: usize) -> TrapFrame {
    TrapFrame { sp, result: UNTOUCHED }
}

/// Lay out `nr` and `args` at `STACK` and dispatch them as `tid`.
pub fn call(kernel: &TestKernel, tid: Tid, nr: usize, args: &[usize]) -> (Disposition, usize) {
    let words = core::iter::once(&nr).chain(args);
    for (i, word) in words.enumerate() {
        kernel
            .memory()
            .poke(tid, STACK + i * WORD_SIZE, &word.to_ne_bytes());
    }
    let mut frame = frame(STACK);
    let disposition = kernel.dispatch(tid, &mut frame);
    (disposition, frame.result)
}
