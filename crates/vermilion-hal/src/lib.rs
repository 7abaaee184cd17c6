#![no_std]

use core::sync::atomic::{fence, Ordering};

/// Sleeps between polls and for the fixed settle intervals of panel power
/// sequencing and vblank waits.
pub use embedded_hal::delay::DelayNs;

/// One mapped MMIO register window (VDC, MBX, MCH or the framebuffer
/// aperture).
///
/// Offsets are byte offsets from the window base. Accesses are not safe to
/// issue concurrently; the core assumes exclusive ownership.
pub trait RegisterWindow {
    /// Read a 32-bit register.
    fn read32(&mut self, offset: usize) -> u32;

    /// Write a 32-bit register.
    fn write32(&mut self, offset: usize, value: u32);

    /// Full memory barrier between a state-changing write and the writes
    /// that depend on it.
    fn barrier(&mut self) {
        fence(Ordering::SeqCst);
    }
}

/// x86 port I/O, used for the board GPIO latch.
pub trait PortIo {
    fn inl(&mut self, port: u16) -> u32;
    fn outl(&mut self, port: u16, value: u32);
}

/// PCI bus/device/function triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PciAddress {
    pub bus: u8,
    pub device: u8,
    pub function: u8,
}

impl PciAddress {
    pub const fn new(bus: u8, device: u8, function: u8) -> Self {
        Self {
            bus,
            device,
            function,
        }
    }
}

impl core::fmt::Display for PciAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:02x}:{:02x}.{}", self.bus, self.device, self.function)
    }
}

/// PCI configuration space access for board discovery.
pub trait PciConfig {
    /// Find the `index`-th function matching `vendor:device`.
    fn find_device(&mut self, vendor: u16, device: u16, index: usize) -> Option<PciAddress>;

    fn config_read32(&mut self, addr: PciAddress, reg: u8) -> u32;

    fn config_read8(&mut self, addr: PciAddress, reg: u8) -> u8;
}

/// Physical address range to be mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub base: u64,
    pub size: usize,
}

impl Region {
    pub const fn new(base: u64, size: usize) -> Self {
        Self { base, size }
    }
}

/// Maps and releases register windows.
///
/// Implementations MUST make `unmap` infallible; it runs on error paths.
pub trait WindowMapper {
    type Window: RegisterWindow;
    type Error: core::fmt::Debug;

    /// Map `region`. `name` is used for diagnostics only.
    fn map(&mut self, name: &'static str, region: Region) -> Result<Self::Window, Self::Error>;

    fn unmap(&mut self, window: Self::Window);
}

/// Volatile accessor over an already-mapped MMIO range.
#[derive(Debug)]
pub struct Mmio {
    ptr: *mut u8,
    size: usize,
}

impl Mmio {
    /// # Safety
    ///
    /// `ptr` must point to a mapping of at least `size` bytes that stays
    /// valid for the lifetime of the returned value, and nothing else may
    /// access it concurrently.
    #[must_use]
    pub const unsafe fn from_ptr(ptr: *mut u8, size: usize) -> Self {
        Self { ptr, size }
    }

    #[must_use]
    pub const fn as_ptr(&self) -> *mut u8 {
        self.ptr
    }

    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Panics unless `offset` names a whole aligned word inside the window.
    fn check(&self, offset: usize) {
        assert!(
            offset % 4 == 0 && offset.checked_add(4).is_some_and(|end| end <= self.size),
            "MMIO access at {offset:#x} outside {:#x}-byte window",
            self.size
        );
    }
}

impl RegisterWindow for Mmio {
    fn read32(&mut self, offset: usize) -> u32 {
        self.check(offset);
        // SAFETY: `from_ptr` guarantees the mapping covers `size` bytes and
        // `check` keeps the word inside it.
        unsafe { core::ptr::read_volatile(self.ptr.add(offset).cast::<u32>()) }
    }

    fn write32(&mut self, offset: usize, value: u32) {
        self.check(offset);
        // SAFETY: as above.
        unsafe { core::ptr::write_volatile(self.ptr.add(offset).cast::<u32>(), value) }
    }
}
