use anyhow::{Context as _, Result};
use clap::Args;
use mpp_consensus::{EpochSchedule, ForkSchedule, SLOTS_PER_EPOCH};

/// Protocol constants and the hard fork schedule.
#[derive(Args, Debug, Clone)]
pub struct ConsensusArgs {
    /// Number of slots in an epoch. Must match the protocol constant.
    #[arg(long = "slots-per-epoch", env = "NUM_SLOTS_IN_EPOCH", default_value_t = SLOTS_PER_EPOCH)]
    pub slots_per_epoch: u64,

    /// Global slot since genesis at which the first hard fork starts.
    #[arg(
        long = "fork1-start-slot",
        env = "FORK_1_START_SLOT",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub fork1_start_slot: u64,

    /// Global slot since genesis at which the second hard fork starts, `0` while it is not
    /// activated.
    #[arg(long = "fork2-start-slot", env = "FORK_2_START_SLOT", default_value_t = 0)]
    pub fork2_start_slot: u64,
}

impl ConsensusArgs {
    /// Validates the arguments into an [`EpochSchedule`].
    pub fn epoch_schedule(&self) -> Result<EpochSchedule> {
        let forks = ForkSchedule::new(self.fork1_start_slot, self.fork2_start_slot)
            .context("Invalid fork start slots")?;
        EpochSchedule::new(self.slots_per_epoch, forks).context("Invalid epoch schedule")
    }
}
