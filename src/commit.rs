//! Buffered commit engine.
//!
//! A commit consumes one [`BufferSnapshot`] and moves through fixed phases:
//!
//! ```text
//! Idle -> PartitioningInputs -> ApplyingSets -> VerifyingSets -> ApplyingGets -> Aggregating -> Done
//! ```
//!
//! Sets are written in one batch and then read back, because the device
//! acknowledges a write without saying whether it took effect. Buffered gets
//! are serviced only after that read-back, so a get of a property set in the
//! same commit sees the new value.
//!
//! The result list is always, in order: entries that failed at buffering time
//! (sets, then gets), the verified set results, the get results. A transport
//! failure during the set phase or the get phase becomes one aggregate entry
//! for that phase; the other phase still runs.

use crate::buffer::BufferSnapshot;
use bcr_core::codec::device_values_equal;
use bcr_core::error::TransportError;
use bcr_core::{
    BcrError, BcrResult, BufferedMethod, CommitEntry, PropertyValues, ResolvedSetting, Session,
    SettingId, Transport,
};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::instrument;

/// Phase of a running commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitPhase {
    /// Not started
    Idle,
    /// Splitting usable entries from ones that failed at buffering time
    PartitioningInputs,
    /// Batched write in flight
    ApplyingSets,
    /// Read-back of the written properties in flight
    VerifyingSets,
    /// Batched read in flight
    ApplyingGets,
    /// Concatenating results
    Aggregating,
    /// Finished; the result list is complete
    Done,
}

/// Drives one commit against a transport.
pub struct BufferCommitEngine<'a> {
    transport: &'a dyn Transport,
    timeout: Option<Duration>,
    phase: CommitPhase,
    transitions: Vec<CommitPhase>,
}

impl<'a> BufferCommitEngine<'a> {
    /// Engine in the `Idle` phase.
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self {
            transport,
            timeout: None,
            phase: CommitPhase::Idle,
            transitions: vec![CommitPhase::Idle],
        }
    }

    /// Bound every transport call by `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Current phase.
    pub fn phase(&self) -> CommitPhase {
        self.phase
    }

    /// Every phase entered so far, in order.
    pub fn transitions(&self) -> &[CommitPhase] {
        &self.transitions
    }

    fn enter(&mut self, phase: CommitPhase, entries: usize) {
        tracing::debug!(from = ?self.phase, to = ?phase, entries, "Commit phase");
        self.phase = phase;
        self.transitions.push(phase);
    }

    /// Run the commit to completion and return the result list.
    ///
    /// Never fails: every problem is reported as an entry.
    #[instrument(
        name = "commit_buffer",
        skip_all,
        fields(gets = snapshot.gets.len(), sets = snapshot.sets.len())
    )]
    pub async fn run(&mut self, session: Option<&Session>, snapshot: BufferSnapshot) -> Vec<CommitEntry> {
        let Some(session) = session else {
            self.enter(CommitPhase::Done, 0);
            return vec![CommitEntry::aggregate(None, &BcrError::NoConnection)];
        };
        if snapshot.is_empty() {
            self.enter(CommitPhase::Done, 0);
            return vec![CommitEntry::aggregate(None, &BcrError::EmptyCommitBuffer)];
        }

        self.enter(
            CommitPhase::PartitioningInputs,
            snapshot.gets.len() + snapshot.sets.len(),
        );
        let mut broken = Vec::new();
        let sets = partition(snapshot.sets, BufferedMethod::SetBuffered, &mut broken);
        let gets = partition(snapshot.gets, BufferedMethod::GetBuffered, &mut broken);

        let mut set_results = Vec::new();
        if !sets.is_empty() {
            set_results = self.apply_sets(session, &sets).await;
        }

        let mut get_results = Vec::new();
        if !gets.is_empty() {
            self.enter(CommitPhase::ApplyingGets, gets.len());
            get_results = self.apply_gets(session, &gets).await;
        }

        self.enter(
            CommitPhase::Aggregating,
            broken.len() + set_results.len() + get_results.len(),
        );
        let mut results = broken;
        results.extend(set_results);
        results.extend(get_results);
        self.enter(CommitPhase::Done, results.len());
        results
    }

    async fn apply_sets(
        &mut self,
        session: &Session,
        sets: &[(SettingId, ResolvedSetting)],
    ) -> Vec<CommitEntry> {
        self.enter(CommitPhase::ApplyingSets, sets.len());

        let mut values = PropertyValues::new();
        for (_, resolved) in sets {
            values.insert(
                resolved.command.clone(),
                resolved.value.clone().unwrap_or(Value::Null),
            );
        }
        let names = command_names(sets);
        tracing::debug!(values = ?values, "Batch set");

        if let Err(e) = bounded(self.timeout, self.transport.set_properties(session, values)).await {
            tracing::warn!(status = e.code, error = %e, "Batch set failed");
            return vec![CommitEntry::aggregate(
                Some(BufferedMethod::SetBuffered),
                &e.into(),
            )];
        }

        self.enter(CommitPhase::VerifyingSets, names.len());
        let read_back = match bounded(self.timeout, self.transport.get_properties(session, &names)).await {
            Ok(values) => values,
            Err(e) => {
                tracing::warn!(status = e.code, error = %e, "Batch set read-back failed");
                return vec![CommitEntry::aggregate(
                    Some(BufferedMethod::SetBuffered),
                    &e.into(),
                )];
            }
        };
        tracing::debug!(read_back = ?read_back, "Batch set read-back");

        sets.iter()
            .map(|(id, resolved)| {
                CommitEntry::for_setting(
                    BufferedMethod::SetBuffered,
                    id,
                    verify_write(resolved, &read_back).map(|()| None),
                )
            })
            .collect()
    }

    async fn apply_gets(
        &mut self,
        session: &Session,
        gets: &[(SettingId, ResolvedSetting)],
    ) -> Vec<CommitEntry> {
        let names = command_names(gets);
        tracing::debug!(names = ?names, "Batch get");

        let values = match bounded(self.timeout, self.transport.get_properties(session, &names)).await {
            Ok(values) => values,
            Err(e) => {
                tracing::warn!(status = e.code, error = %e, "Batch get failed");
                return vec![CommitEntry::aggregate(
                    Some(BufferedMethod::GetBuffered),
                    &e.into(),
                )];
            }
        };
        tracing::debug!(values = ?values, "Batch get response");

        gets.iter()
            .map(|(id, resolved)| {
                CommitEntry::for_setting(
                    BufferedMethod::GetBuffered,
                    id,
                    read_value(resolved, &values).map(Some),
                )
            })
            .collect()
    }
}

fn partition(
    defs: Vec<bcr_core::SettingDefinition>,
    method: BufferedMethod,
    broken: &mut Vec<CommitEntry>,
) -> Vec<(SettingId, ResolvedSetting)> {
    let mut usable = Vec::with_capacity(defs.len());
    for def in defs {
        match def.outcome {
            Ok(resolved) => usable.push((def.id, resolved)),
            Err(ref e) => {
                tracing::debug!(setting = %def.id, %method, status = e.status(), "Skipping entry that failed when buffered");
                broken.push(CommitEntry::from_definition(method, &def));
            }
        }
    }
    usable
}

/// Requested command names, first occurrence order, without repeats.
fn command_names(entries: &[(SettingId, ResolvedSetting)]) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(entries.len());
    for (_, resolved) in entries {
        if !names.contains(&resolved.command) {
            names.push(resolved.command.clone());
        }
    }
    names
}

/// Compare a read-back against the value that was written.
pub(crate) fn verify_write(resolved: &ResolvedSetting, read_back: &PropertyValues) -> BcrResult<()> {
    match read_back.get(&resolved.command) {
        None | Some(Value::Null) => Err(BcrError::missing_property(&resolved.command)),
        Some(actual) => match &resolved.value {
            Some(expected) if device_values_equal(actual, expected) => Ok(()),
            _ => Err(BcrError::rejected_value()),
        },
    }
}

/// Decode the value of `resolved.command` from a read response.
pub(crate) fn read_value(resolved: &ResolvedSetting, values: &PropertyValues) -> BcrResult<String> {
    match values.get(&resolved.command) {
        None | Some(Value::Null) => Err(BcrError::missing_property(&resolved.command)),
        Some(device) => resolved.rule.decode(device),
    }
}

/// Strict equality, except that numbers compare by value (`5` equals `5.0`).
/// Await a transport call, failing with "not responding" after `timeout`.
pub(crate) async fn bounded<T, F>(timeout: Option<Duration>, call: F) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or_else(|_| Err(TransportError::not_responding())),
        None => call.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bcr_core::codec::{associations, ValueRule};
    use bcr_core::error::{INVALID_PARAMETER, INVALID_SETTING_VALUE};
    use bcr_driver_mock::{ops, ErrorConfig, ErrorScenario, MockScanner};
    use serde_json::json;
    use tracing_test::traced_test;

    fn resolved(command: &str, value: Value) -> ResolvedSetting {
        ResolvedSetting {
            command: command.into(),
            rule: ValueRule::Map {
                value_map: associations(&json!([{ "true": true }, { "false": false }])).unwrap(),
                reverse_value_map: None,
            },
            value: Some(value),
        }
    }

    #[test]
    fn test_verify_write() {
        let mut read_back = PropertyValues::new();
        read_back.insert("A".into(), json!(true));
        read_back.insert("B".into(), json!(false));
        read_back.insert("C".into(), Value::Null);

        assert!(verify_write(&resolved("A", json!(true)), &read_back).is_ok());

        let err = verify_write(&resolved("B", json!(true)), &read_back).unwrap_err();
        assert_eq!(err.status(), INVALID_SETTING_VALUE);
        assert_eq!(err.to_string(), "Scanner rejects the setting value.");

        for missing in ["C", "D"] {
            let err = verify_write(&resolved(missing, json!(true)), &read_back).unwrap_err();
            assert_eq!(err.status(), INVALID_PARAMETER);
            assert_eq!(err.to_string(), format!("Invalid scanner property: {}", missing));
        }
    }

    #[test]
    fn test_command_names_dedup() {
        let entries = vec![
            (SettingId::new("a", "b", "c"), resolved("X", json!(true))),
            (SettingId::new("a", "b", "d"), resolved("Y", json!(true))),
            (SettingId::new("a", "b", "c"), resolved("X", json!(false))),
        ];
        assert_eq!(command_names(&entries), vec!["X".to_string(), "Y".to_string()]);
    }

    #[traced_test]
    #[tokio::test]
    async fn test_batch_failure_is_logged() {
        let scanner = MockScanner::builder()
            .error_config(ErrorConfig::scenario(ErrorScenario::NotResponding {
                operation: ops::SET_PROPERTIES,
            }))
            .build();
        let session = scanner.open(None).await.unwrap();
        let mut snapshot = BufferSnapshot::default();
        snapshot.sets.push(bcr_core::SettingDefinition {
            id: SettingId::new("Symbology", "Code39", "Enable"),
            outcome: Ok(resolved("DEC_CODE39_ENABLED", json!(true))),
        });

        let results = BufferCommitEngine::new(&scanner).run(Some(&session), snapshot).await;
        assert_eq!(results.len(), 1);
        assert!(results[0].is_aggregate());
        assert!(logs_contain("Batch set failed"));
        assert!(logs_contain("Commit phase"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_times_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, TransportError>(())
        };
        let err = bounded(Some(Duration::from_millis(100)), slow).await.unwrap_err();
        assert_eq!(err, TransportError::not_responding());

        let fast = async { Ok::<_, TransportError>(7) };
        assert_eq!(bounded(None, fast).await.unwrap(), 7);
    }
}
