use mission_core::config::MissionConfig;
use mission_core::mission::{BoardParts, MissionSequencer};

use crate::hw::RigBoard;
use crate::status;

#[embassy_executor::task]
pub async fn run(parts: BoardParts<RigBoard>) -> ! {
    match MissionSequencer::boot(MissionConfig::reference(), parts).await {
        Ok(sequencer) => {
            let snapshot = status::snapshot();
            defmt::info!(
                "mission: ready, link {}, log lines {}",
                snapshot.link_connected,
                snapshot.log_lines
            );
            sequencer.run().await
        }
        Err(failure) => {
            defmt::error!("mission: boot halted: {}", defmt::Display2Format(&failure.fault()));
            failure.halt().await
        }
    }
}
