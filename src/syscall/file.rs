//! File handlers.
//!
//! Every storage call below is made through `self.fs.lock()`. Reads, writes
//! and queries on an open file take the file out of the registry first and
//! hold only the storage lock while the engine runs; open and close hold
//! both, registry first.

use alloc::vec;

use super::handler::{Handled, Stop};
use crate::config::ReadTarget;
use crate::fs::{Fd, Storage};
use crate::kernel::{Console, FileOf, Kernel, Platform};
use crate::mm::{PageAccess, UserAddr, PAGE_SIZE};
use crate::proc::Tid;
use crate::security::ZeroOnDrop;

/// Largest staging buffer `read` allocates at once.
const READ_CHUNK: usize = PAGE_SIZE;

impl<P: Platform> Kernel<P> {
    /// Run `f` on the storage engine and the file behind `fd`.
    ///
    /// The file is taken out of the descriptor table for the duration of the
    /// call, so only the storage lock is held while `f` runs. `None` if `tid`
    /// has no such descriptor.
    fn with_file<R>(
        &self,
        tid: Tid,
        fd: Fd,
        f: impl FnOnce(&mut P::Storage, &mut FileOf<P>) -> R,
    ) -> Option<R> {
        let mut file = self
            .procs
            .lock()
            .get_mut(tid)?
            .process_mut()
            .files_mut()
            .remove(fd)
            .ok()?;

        let result = f(&mut *self.fs.lock(), &mut file);

        let mut procs = self.procs.lock();
        match procs.get_mut(tid) {
            Some(context) => context.process_mut().files_mut().restore(fd, file),
            None => {
                drop(procs);
                self.fs.lock().close(file);
            }
        }
        Some(result)
    }

    pub(super) fn sys_create(&self, tid: Tid, name: usize, initial_size: usize) -> Handled {
        let Some(name) = self.user_str(tid, name)? else {
            return Ok(0);
        };
        let created = self.fs.lock().create(&name, initial_size as u32);
        Ok(created as isize)
    }

    pub(super) fn sys_remove(&self, tid: Tid, name: usize) -> Handled {
        let Some(name) = self.user_str(tid, name)? else {
            return Ok(0);
        };
        let removed = self.fs.lock().remove(&name);
        Ok(removed as isize)
    }

    pub(super) fn sys_open(&self, tid: Tid, name: usize) -> Handled {
        let Some(name) = self.user_str(tid, name)? else {
            return Ok(-1);
        };
        let mut procs = self.procs.lock();
        let Some(context) = procs.get_mut(tid) else {
            return Ok(-1);
        };
        let mut storage = self.fs.lock();
        match context.process_mut().files_mut().open(&mut *storage, &name) {
            Ok(fd) => Ok(fd.raw() as isize),
            Err(err) => {
                log::debug!("[SYSCALL] {}: open {:?}: {}", tid, name, err);
                Ok(-1)
            }
        }
    }

    pub(super) fn sys_filesize(&self, tid: Tid, fd: usize) -> isize {
        self.with_file(tid, Fd::from_word(fd), |storage, file| {
            storage.length(file) as isize
        })
        .unwrap_or(-1)
    }

    /// Read from `fd` into the caller's buffer.
    ///
    /// The whole read runs under one storage guard. Data is staged in a
    /// zeroed kernel buffer, one page at a time, and copied out byte by byte
    /// through the write probe. A byte that cannot be written ends the read
    /// with -1; bytes already copied stay copied.
    pub(super) fn sys_read(&self, tid: Tid, fd: usize, buffer: usize, size: usize) -> Handled {
        let guard = self.guard(tid);
        let buffer = UserAddr::new(buffer);
        match self.config.read_target {
            ReadTarget::Sized => guard.validate_range(buffer, size, PageAccess::WRITE)?,
            ReadTarget::Terminated => {
                guard.validate_cstring(buffer)?;
            }
        }

        let read = self.with_file(tid, Fd::from_word(fd), |storage, file| {
            let mut staging = ZeroOnDrop::new(vec![0u8; size.min(READ_CHUNK)]);
            let mut total = 0;
            loop {
                let want = (size - total).min(READ_CHUNK);
                let chunk = &mut staging.inner_mut()[..want];
                let got = storage.read(file, chunk).min(want);
                for (i, &byte) in chunk[..got].iter().enumerate() {
                    let written = buffer
                        .checked_add(total + i)
                        .is_some_and(|dst| guard.write_byte(dst, byte));
                    if !written {
                        return -1;
                    }
                }
                total += got;
                if got < want || total == size {
                    return total as isize;
                }
            }
        });
        Ok(read.unwrap_or(-1))
    }

    /// Write the caller's buffer to `fd`.
    ///
    /// fd 0 is not writable and ends the caller; fd 1 goes to the console
    /// without touching storage.
    pub(super) fn sys_write(&self, tid: Tid, fd: usize, buffer: usize, size: usize) -> Handled {
        let bytes = self.guard(tid).copy_in(UserAddr::new(buffer), size)?;
        match Fd::from_word(fd) {
            Fd::STDIN => Err(Stop::Exit(-1)),
            Fd::STDOUT => {
                self.console.write_bytes(&bytes);
                Ok(bytes.len() as isize)
            }
            fd => Ok(self
                .with_file(tid, fd, |storage, file| storage.write(file, &bytes) as isize)
                .unwrap_or(-1)),
        }
    }

    pub(super) fn sys_seek(&self, tid: Tid, fd: usize, position: usize) -> isize {
        self.with_file(tid, Fd::from_word(fd), |storage, file| {
            storage.seek(file, position as u32);
            0
        })
        .unwrap_or(-1)
    }

    pub(super) fn sys_tell(&self, tid: Tid, fd: usize) -> isize {
        self.with_file(tid, Fd::from_word(fd), |storage, file| {
            storage.tell(file) as isize
        })
        .unwrap_or(-1)
    }

    pub(super) fn sys_close(&self, tid: Tid, fd: usize) -> isize {
        let mut procs = self.procs.lock();
        let Some(context) = procs.get_mut(tid) else {
            return -1;
        };
        let mut storage = self.fs.lock();
        match context.process_mut().files_mut().close(&mut *storage, Fd::from_word(fd)) {
            Ok(()) => 0,
            Err(_) => -1,
        }
    }
}
