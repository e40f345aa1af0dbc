use clap::{Parser, Subcommand};
use log::LevelFilter;

#[derive(Parser, Debug)]
#[clap(version, about = "Expose disk images as kernel block devices, and reverse it")]
pub struct Cli {
    /// Logging verbosity [OFF, ERROR, WARN, INFO, DEBUG, TRACE]
    #[arg(global = true, short, long, default_value_t = LevelFilter::Info)]
    pub verbosity: LevelFilter,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Attach a disk image to a free /dev/nbd* device, or detach it
    Nbd {
        /// Path of the disk image
        #[clap(index = 1)]
        name: String,

        /// Desired state: 'present' or 'absent'
        #[clap(short, long)]
        state: String,

        /// Image format passed to the binding tool
        #[clap(short, long, default_value = "qcow2")]
        format: String,

        /// Seconds to wait for the binding process to exit on detach
        #[clap(long, default_value_t = 60)]
        termination_timeout: u64,
    },

    /// Map the partitions of a disk image or block device, or unmap them
    Partitions {
        /// Path of the disk image or block device
        #[clap(index = 1)]
        name: String,

        /// Desired state: 'present' or 'absent'
        #[clap(short, long)]
        state: String,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_asserts() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_nbd() {
        let cli = Cli::parse_from([
            "blockbind",
            "nbd",
            "/images/foo.qcow2",
            "--state",
            "present",
        ]);
        match cli.command {
            Commands::Nbd {
                name,
                state,
                format,
                termination_timeout,
            } => {
                assert_eq!(name, "/images/foo.qcow2");
                assert_eq!(state, "present");
                assert_eq!(format, "qcow2");
                assert_eq!(termination_timeout, 60);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.verbosity, LevelFilter::Info);
    }

    #[test]
    fn test_parse_partitions() {
        let cli = Cli::parse_from([
            "blockbind",
            "-v",
            "debug",
            "partitions",
            "/images/disk.img",
            "--state",
            "absent",
        ]);
        match cli.command {
            Commands::Partitions { name, state } => {
                assert_eq!(name, "/images/disk.img");
                assert_eq!(state, "absent");
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.verbosity, LevelFilter::Debug);
    }
}
