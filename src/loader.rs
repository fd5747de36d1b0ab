use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::info;
use serde::Deserialize;

use crate::LapwiseError;
use crate::telemetry::{RawLap, Session, SessionMetadata};

/// A line of a JSON lines session: either the session metadata or one lap
#[derive(Deserialize)]
#[serde(untagged)]
enum SessionRecord {
    Metadata { metadata: SessionMetadata },
    Lap(RawLap),
}

/// Loads a session from `path`.
///
/// `.jsonl` files hold one lap per line, optionally preceded by a `{"metadata": {...}}`
/// line. Anything else is read as a single JSON `Session` document.
pub fn load_session(path: &Path) -> Result<Session, LapwiseError> {
    if !path.is_file() {
        return Err(LapwiseError::InvalidSessionFile {
            path: format!("{:?}", path),
        });
    }

    let session = match path.extension().and_then(|ext| ext.to_str()) {
        Some("jsonl") => load_session_jsonl(path)?,
        _ => {
            let file = File::open(path).map_err(|e| LapwiseError::SessionLoaderError { source: e })?;
            serde_json::from_reader(BufReader::new(file))
                .map_err(|e| LapwiseError::SessionParseError { source: e })?
        }
    };
    info!("Loaded {} laps from {:?}", session.laps.len(), path);
    Ok(session)
}

fn load_session_jsonl(path: &Path) -> Result<Session, LapwiseError> {
    let records = serde_jsonlines::json_lines(path)
        .map_err(|e| LapwiseError::SessionLoaderError { source: e })?
        .collect::<Result<Vec<SessionRecord>, std::io::Error>>()
        .map_err(|e| LapwiseError::SessionLoaderError { source: e })?;

    let mut session = Session::default();
    for record in records {
        match record {
            SessionRecord::Metadata { metadata } => session.metadata = metadata,
            SessionRecord::Lap(lap) => session.laps.push(lap),
        }
    }
    Ok(session)
}
