//! Wire types of the upstream APIs.
//!
//! # Submodules
//!
//! * [`source`] - source catalog Web API (playlists, albums, recommendations)
//! * [`catalog`] - playback catalog search and ISRC lookup
//!
//! Wire types are converted into the records of [`crate::track`] at this
//! boundary, so nothing past it deals with upstream JSON shapes.

pub mod catalog;
pub mod source;

use crate::error::Result;
use serde::Deserialize;
use std::fmt::Debug;

/// Parses a JSON response body into `T`.
///
/// `origin` names the endpoint in logs. The parsed value is logged at trace
/// level; on failure the raw payload is logged instead, pretty-printed if
/// it is JSON of an unexpected shape.
///
/// # Errors
///
/// Returns `DataLoss` for truncated bodies and `InvalidArgument` for bodies
/// that are not JSON or do not match `T`.
pub fn json<T>(body: &str, origin: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de> + Debug,
{
    serde_json::from_str(body)
        .inspect(|result| trace!("{origin}: {result:#?}"))
        .map_err(|e| {
            match serde_json::from_str::<serde_json::Value>(body) {
                Ok(json) => warn!("{origin}: unexpected response shape ({e}): {json:#?}"),
                Err(_) => {
                    warn!("{origin}: failed parsing response ({e})");
                    trace!("{body}");
                }
            }
            e.into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[derive(Debug, Deserialize)]
    struct Probe {
        total: usize,
    }

    #[test]
    fn parses_and_reports_mismatches() {
        let probe: Probe = json(r#"{"total": 25}"#, "probe").unwrap();
        assert_eq!(probe.total, 25);

        let err = json::<Probe>(r#"{"total": "many"}"#, "probe").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }
}
