//! Host fakes for the collaborators the syscall layer consumes.

use std::cell::Cell;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::drivers::{Console, Machine};
use crate::fs::FileSystem;
use crate::mm::address::{PAGE_MASK, PAGE_SHIFT, PAGE_SIZE};
use crate::mm::{AddressSpace, Mapping, PageFlags, PhysAddr, VirtAddr};
use crate::process::{Pid, Process, ProcessManager};
use crate::syscall::validate::WORD_SIZE;
use crate::syscall::{Kernel, SyscallOutcome};

/// A user address space made of individually mapped pages.
#[derive(Debug, Default)]
pub struct SparseSpace {
    pages: BTreeMap<usize, (usize, PageFlags)>,
    frames: Vec<Box<[u8; PAGE_SIZE]>>,
    translations: Cell<usize>,
}

impl SparseSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(&mut self, base: VirtAddr, pages: usize, flags: PageFlags) {
        for i in 0..pages {
            self.frames.push(Box::new([0; PAGE_SIZE]));
            self.pages
                .insert(base.page_number() + i, (self.frames.len() - 1, flags));
        }
    }

    pub fn map_data(&mut self, base: VirtAddr, pages: usize) {
        self.map(base, pages, PageFlags::USER_DATA);
    }

    pub fn map_code(&mut self, base: VirtAddr, pages: usize) {
        self.map(base, pages, PageFlags::USER_CODE);
    }

    fn slot(&self, va: usize) -> (usize, usize) {
        let (frame, _) = self.pages[&(va >> PAGE_SHIFT)];
        (frame, va & PAGE_MASK)
    }

    /// Write bytes regardless of permissions; the pages must be mapped.
    pub fn write(&mut self, va: VirtAddr, bytes: &[u8]) {
        for (i, &byte) in bytes.iter().enumerate() {
            let (frame, offset) = self.slot(va.as_usize() + i);
            self.frames[frame][offset] = byte;
        }
    }

    pub fn read(&self, va: VirtAddr, len: usize) -> Vec<u8> {
        (0..len)
            .map(|i| {
                let (frame, offset) = self.slot(va.as_usize() + i);
                self.frames[frame][offset]
            })
            .collect()
    }

    pub fn push_words(&mut self, va: VirtAddr, words: &[usize]) {
        for (i, word) in words.iter().enumerate() {
            self.write(VirtAddr::new(va.as_usize() + i * WORD_SIZE), &word.to_ne_bytes());
        }
    }

    /// Number of page-table walks performed so far.
    pub fn translations(&self) -> usize {
        self.translations.get()
    }
}

impl AddressSpace for SparseSpace {
    fn translate(&self, va: VirtAddr) -> Option<Mapping> {
        self.translations.set(self.translations.get() + 1);
        let &(frame, flags) = self.pages.get(&va.page_number())?;
        Some(Mapping {
            phys: PhysAddr::new((frame << PAGE_SHIFT) | va.page_offset()),
            flags,
        })
    }

    fn load(&self, pa: PhysAddr) -> u8 {
        self.frames[pa.page_frame_number()][pa.page_offset()]
    }

    fn store(&mut self, pa: PhysAddr, byte: u8) {
        self.frames[pa.page_frame_number()][pa.page_offset()] = byte;
    }
}

/// An open in-memory file.
#[derive(Debug)]
pub struct MemFile {
    name: String,
    pos: u32,
}

/// One side of a filesystem call, as seen from outside the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsEvent {
    Enter,
    Leave,
}

/// Records filesystem calls in a place the guard does not protect, so
/// calls that overlap show up as nested events.
#[derive(Debug, Default)]
pub struct Occupancy {
    inside: AtomicUsize,
    peak: AtomicUsize,
    events: Mutex<Vec<FsEvent>>,
}

impl Occupancy {
    fn enter(&self) {
        let now = self.inside.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.events.lock().unwrap().push(FsEvent::Enter);
    }

    fn leave(&self) {
        self.events.lock().unwrap().push(FsEvent::Leave);
        self.inside.fetch_sub(1, Ordering::SeqCst);
    }

    /// Most calls ever in progress at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Every call left before the next one entered.
    pub fn is_serial(&self) -> bool {
        self.events
            .lock()
            .unwrap()
            .chunks(2)
            .all(|pair| pair == [FsEvent::Enter, FsEvent::Leave])
    }

    pub fn entries(&self) -> usize {
        let events = self.events.lock().unwrap();
        events.iter().filter(|&&e| e == FsEvent::Enter).count()
    }
}

/// An in-memory filesystem that counts calls and records their
/// occupancy and the largest buffer it was handed.
#[derive(Debug, Default)]
pub struct MemFs {
    files: BTreeMap<String, Vec<u8>>,
    open_handles: usize,
    calls: usize,
    largest_transfer: usize,
    occupancy: Arc<Occupancy>,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(name: &str, data: &[u8]) -> Self {
        let mut fs = Self::new();
        fs.files.insert(name.into(), data.to_vec());
        fs
    }

    pub fn open_handles(&self) -> usize {
        self.open_handles
    }

    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Shared record of entries and exits, readable without the lock.
    pub fn occupancy(&self) -> Arc<Occupancy> {
        Arc::clone(&self.occupancy)
    }

    /// Largest buffer passed to one `read` or `write`.
    pub fn largest_transfer(&self) -> usize {
        self.largest_transfer
    }

    pub fn contents(&self, name: &str) -> Option<&[u8]> {
        self.files.get(name).map(Vec::as_slice)
    }

    fn enter(&mut self) {
        self.calls += 1;
        self.occupancy.enter();
        // Widen the window an unguarded caller would race in.
        for _ in 0..50 {
            std::hint::spin_loop();
        }
    }

    fn exit(&mut self) {
        self.occupancy.leave();
    }

    fn data(&self, file: &MemFile) -> &[u8] {
        self.files.get(&file.name).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl FileSystem for MemFs {
    type File = MemFile;

    fn create(&mut self, name: &str, initial_size: u32) -> bool {
        self.enter();
        let created = !name.is_empty() && !self.files.contains_key(name);
        if created {
            self.files.insert(name.into(), vec![0; initial_size as usize]);
        }
        self.exit();
        created
    }

    fn remove(&mut self, name: &str) -> bool {
        self.enter();
        let removed = self.files.remove(name).is_some();
        self.exit();
        removed
    }

    fn open(&mut self, name: &str) -> Option<MemFile> {
        self.enter();
        let file = self.files.contains_key(name).then(|| MemFile {
            name: name.into(),
            pos: 0,
        });
        self.open_handles += file.is_some() as usize;
        self.exit();
        file
    }

    fn read(&mut self, file: &mut MemFile, buf: &mut [u8]) -> usize {
        self.enter();
        self.largest_transfer = self.largest_transfer.max(buf.len());
        let data = self.data(file);
        let start = (file.pos as usize).min(data.len());
        let count = buf.len().min(data.len() - start);
        buf[..count].copy_from_slice(&data[start..start + count]);
        file.pos += count as u32;
        self.exit();
        count
    }

    fn write(&mut self, file: &mut MemFile, buf: &[u8]) -> usize {
        self.enter();
        self.largest_transfer = self.largest_transfer.max(buf.len());
        // Files do not grow: writes stop at end of file.
        let count = match self.files.get_mut(&file.name) {
            Some(data) => {
                let start = (file.pos as usize).min(data.len());
                let count = buf.len().min(data.len() - start);
                data[start..start + count].copy_from_slice(&buf[..count]);
                count
            }
            None => 0,
        };
        file.pos += count as u32;
        self.exit();
        count
    }

    fn seek(&mut self, file: &mut MemFile, pos: u32) {
        self.enter();
        file.pos = pos;
        self.exit();
    }

    fn tell(&mut self, file: &MemFile) -> u32 {
        self.enter();
        let pos = file.pos;
        self.exit();
        pos
    }

    fn length(&mut self, file: &MemFile) -> u32 {
        self.enter();
        let len = self.data(file).len() as u32;
        self.exit();
        len
    }

    fn close(&mut self, _file: MemFile) {
        self.enter();
        self.open_handles -= 1;
        self.exit();
    }
}

/// A console fed from a script, capturing output.
#[derive(Debug, Default)]
pub struct ScriptConsole {
    input: Mutex<VecDeque<u8>>,
    output: Mutex<Vec<u8>>,
    largest_put: AtomicUsize,
}

impl ScriptConsole {
    pub fn with_input(bytes: &[u8]) -> Self {
        Self {
            input: Mutex::new(bytes.iter().copied().collect()),
            ..Self::default()
        }
    }

    pub fn output(&self) -> Vec<u8> {
        self.output.lock().unwrap().clone()
    }

    pub fn remaining_input(&self) -> usize {
        self.input.lock().unwrap().len()
    }

    /// Largest buffer handed to one `putbuf`.
    pub fn largest_put(&self) -> usize {
        self.largest_put.load(Ordering::SeqCst)
    }
}

impl Console for ScriptConsole {
    fn getc(&self) -> u8 {
        self.input.lock().unwrap().pop_front().unwrap_or(0)
    }

    fn putbuf(&self, buf: &[u8]) {
        self.largest_put.fetch_max(buf.len(), Ordering::SeqCst);
        self.output.lock().unwrap().extend_from_slice(buf);
    }
}

/// Launches only programs it knows, with a fixed exit status each.
#[derive(Debug, Default)]
pub struct FakeProcs {
    programs: BTreeMap<String, i32>,
    children: Mutex<BTreeMap<i32, i32>>,
    launched: Mutex<Vec<String>>,
    next_pid: AtomicUsize,
}

impl FakeProcs {
    pub fn with_program(mut self, name: &str, exit_status: i32) -> Self {
        self.programs.insert(name.into(), exit_status);
        self
    }

    pub fn launched(&self) -> Vec<String> {
        self.launched.lock().unwrap().clone()
    }
}

impl ProcessManager for FakeProcs {
    fn execute(&self, cmd_line: &str) -> Option<Pid> {
        let program = cmd_line.split_whitespace().next()?;
        let status = *self.programs.get(program)?;
        let pid = 2 + self.next_pid.fetch_add(1, Ordering::SeqCst) as i32;
        self.children.lock().unwrap().insert(pid, status);
        self.launched.lock().unwrap().push(cmd_line.into());
        Some(Pid::new(pid))
    }

    fn wait(&self, pid: Pid) -> Option<i32> {
        self.children.lock().unwrap().remove(&pid.as_i32())
    }
}

/// Records a power-off instead of performing it.
#[derive(Debug, Default)]
pub struct FakePower {
    off: AtomicBool,
}

impl FakePower {
    pub fn is_off(&self) -> bool {
        self.off.load(Ordering::SeqCst)
    }
}

impl Machine for FakePower {
    fn power_off(&self) {
        self.off.store(true, Ordering::SeqCst);
    }
}

pub type TestKernel = Kernel<MemFs, FakeProcs, ScriptConsole, FakePower>;
pub type TestProcess = Process<MemFile, SparseSpace>;

/// Top of the user stack; the stack is one page below it.
pub const STACK_TOP: usize = 0x8000_0000;
/// Start of four writable data pages.
pub const DATA: usize = 0x0040_0000;
/// One read-only code page.
pub const CODE: usize = 0x0010_0000;

/// A user process with a stack, data and code.
pub fn user_process(pid: i32) -> TestProcess {
    let mut space = SparseSpace::new();
    space.map_data(VirtAddr::new(STACK_TOP - PAGE_SIZE), 1);
    space.map_data(VirtAddr::new(DATA), 4);
    space.map_code(VirtAddr::new(CODE), 1);
    Process::new(Pid::new(pid), "test", space)
}

/// Push a request at the top of the user stack; returns the stack pointer.
pub fn push_request(process: &mut TestProcess, number: u32, args: &[usize]) -> usize {
    let sp = STACK_TOP - (1 + args.len()) * WORD_SIZE;
    let space = process.space_mut();
    space.push_words(VirtAddr::new(sp), &[number as usize]);
    space.push_words(VirtAddr::new(sp + WORD_SIZE), args);
    sp
}

/// Trap into `kernel` from `process` with `number` and `args`.
pub fn call(kernel: &TestKernel, process: &mut TestProcess, number: u32, args: &[usize]) -> SyscallOutcome {
    let sp = push_request(process, number, args);
    kernel.dispatch(process, VirtAddr::new(sp))
}

/// A kernel and one user process with a stack, data and code.
pub struct Harness {
    pub kernel: TestKernel,
    pub process: TestProcess,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_kernel(test_kernel(MemFs::new()))
    }

    pub fn with_kernel(kernel: TestKernel) -> Self {
        Self {
            kernel,
            process: user_process(1),
        }
    }

    /// Write bytes into user memory at `at`.
    pub fn put(&mut self, at: usize, bytes: &[u8]) -> usize {
        self.process.space_mut().write(VirtAddr::new(at), bytes);
        at
    }

    /// Place a NUL-terminated string at `at`.
    pub fn put_str(&mut self, at: usize, s: &str) -> usize {
        self.put(at, s.as_bytes());
        self.put(at + s.len(), &[0]);
        at
    }

    pub fn read(&self, at: usize, len: usize) -> Vec<u8> {
        self.process.space().read(VirtAddr::new(at), len)
    }

    pub fn push_request(&mut self, number: u32, args: &[usize]) -> usize {
        push_request(&mut self.process, number, args)
    }

    pub fn call(&mut self, number: u32, args: &[usize]) -> SyscallOutcome {
        call(&self.kernel, &mut self.process, number, args)
    }

    pub fn fs<R>(&self, op: impl FnOnce(&mut MemFs) -> R) -> R {
        self.kernel.fs().with(op)
    }
}

/// A kernel over `fs` with an empty console and no programs.
pub fn test_kernel(fs: MemFs) -> TestKernel {
    Kernel::new(fs, FakeProcs::default(), ScriptConsole::default(), FakePower::default())
}
