use serde::{Deserialize, Serialize};

use crate::core::{ControllerKind, DifferentialConfig};

/// The three replay-loop shapes a harness may exercise per input: advance
/// only, restore-then-advance, or advance-restore-advance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleKind {
    Simple,
    Rerecord,
    Full,
}

/// A test script, as consumed by the external replay harness. The key names
/// are the on-disk JSON format.
/// ```
/// let script = renes::core::TestScript::from_json(r#"{
///   "Rom File": "game.nes",
///   "Initial State File": "",
///   "Sequence File": "inputs.txt",
///   "Expected ROM SHA1": "0000000000000000000000000000000000000000",
///   "Disable State Blocks": ["SRAM"],
///   "Controller 1 Type": "Joypad",
///   "Controller 2 Type": "None",
///   "Differential Compression":
///     { "Enabled": true, "Max Differences": 12800, "Use Zlib": false }
/// }"#).unwrap();
/// assert!(script.differential_compression.enabled);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestScript {
    #[serde(rename = "Rom File")]
    pub rom_file: String,
    #[serde(rename = "Initial State File", default)]
    pub initial_state_file: String,
    #[serde(rename = "Sequence File")]
    pub sequence_file: String,
    #[serde(rename = "Expected ROM SHA1", default)]
    pub expected_rom_sha1: String,
    #[serde(rename = "Disable State Blocks", default)]
    pub disable_state_blocks: Vec<String>,
    #[serde(rename = "Controller 1 Type")]
    pub controller_1_type: ControllerKind,
    #[serde(rename = "Controller 2 Type")]
    pub controller_2_type: ControllerKind,
    #[serde(rename = "Differential Compression", default)]
    pub differential_compression: DifferentialConfig,
}

impl TestScript {
    pub fn from_json(json: &str) -> Result<TestScript, String> {
        serde_json::from_str(json).map_err(|e| format!("Could not parse test script: {}", e))
    }

    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self).map_err(|e| e.to_string())
    }
}
