pub mod cli;
pub mod constants;
pub mod dependencies;
pub mod devices;
pub mod error;
pub mod exe;
pub mod kpartx;
pub mod process;
pub mod qemu_nbd;
pub mod reconcile;

pub(crate) mod crate_private {
    pub trait Sealed {}
}
