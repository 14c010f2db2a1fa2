//! Serialization round-trip leg.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::bail;
use crate::environment::{RaceEnvironment, properties};
use crate::error::{ErrorKind, RaceResult};
use crate::stages::RaceStage;

/// The structured payload carried through the round-trip.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct CourseRecord {
    server_name: String,
    server_port: String,
    context_path: String,
    checkpoints: Vec<u32>,
}

/// An encoding round-trip leg.
///
/// Builds a structured record from the race environment, serializes it to
/// JSON, parses it back, and verifies field fidelity.
#[derive(Debug, Clone, Default)]
pub struct EncodingStage;

#[async_trait]
impl RaceStage for EncodingStage {
    fn name(&self) -> &'static str {
        "encoding"
    }

    async fn run(&mut self, environment: &RaceEnvironment) -> RaceResult<()> {
        let record = CourseRecord {
            server_name: environment
                .get(properties::SERVER_NAME)
                .unwrap_or("localhost")
                .to_owned(),
            server_port: environment
                .get(properties::SERVER_PORT)
                .unwrap_or("8080")
                .to_owned(),
            context_path: environment
                .get(properties::CONTEXT_PATH)
                .unwrap_or("/")
                .to_owned(),
            checkpoints: (1..=10).collect(),
        };

        let encoded = serde_json::to_string(&record)?;
        let decoded: CourseRecord = serde_json::from_str(&encoded)?;

        if decoded != record {
            bail!(
                ErrorKind::StageFailed,
                "decoded record does not match the original",
                encoded
            );
        }

        Ok(())
    }
}
