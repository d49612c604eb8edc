//! Logical-to-physical-to-stream channel resolution
//!
//! Built once at connect time. A logical channel whose stream column cannot
//! be resolved is *degraded*: it stays in the session and its samples are
//! zero-filled at acquisition time. Loose electrodes therefore never abort
//! a session, but a silent wiring error looks like flat data; callers are
//! expected to run the quality check separately.

use crate::device::EegDevice;
use crate::error::{SsvepError, SsvepResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// Default physical channel layout (BrainAccess CAP cable order)
pub fn default_physical_mapping() -> HashMap<String, usize> {
    [
        ("F3", 0), ("F4", 1), ("C3", 2), ("C4", 3),
        ("P3", 4), ("P4", 5), ("O1", 6), ("O2", 7),
    ]
    .into_iter()
    .map(|(name, idx)| (name.to_string(), idx))
    .collect()
}

/// Resolution state of one logical channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelBinding {
    /// Logical channel name (e.g. "O1")
    pub name: String,
    /// Physical device index from the name table; `None` if the name is
    /// not present in the table
    pub physical: Option<usize>,
    /// Device-assigned stream column; `None` until resolved, or if the
    /// device query failed
    pub column: Option<usize>,
}

impl ChannelBinding {
    /// A channel with no resolvable stream column is degraded and will be
    /// zero-filled at acquisition time.
    pub fn is_degraded(&self) -> bool {
        self.column.is_none()
    }
}

/// Ordered map of requested logical channels to device stream columns
#[derive(Debug, Clone)]
pub struct ChannelMap {
    bindings: Vec<ChannelBinding>,
}

impl ChannelMap {
    /// Build the logical-name to physical-index part of the map.
    ///
    /// Unknown names are kept as degraded bindings rather than rejected.
    pub fn new(channels: &[String], mapping: Option<&HashMap<String, usize>>) -> SsvepResult<Self> {
        if channels.is_empty() {
            return Err(SsvepError::InvalidConfig {
                message: "at least one logical channel is required".to_string(),
            });
        }
        let default_mapping;
        let table = match mapping {
            Some(table) => table,
            None => {
                default_mapping = default_physical_mapping();
                &default_mapping
            }
        };

        let bindings = channels
            .iter()
            .map(|name| ChannelBinding {
                name: name.clone(),
                physical: table.get(name).copied(),
                column: None,
            })
            .collect();

        Ok(ChannelMap { bindings })
    }

    /// Physical indices to enable on the device, deduplicated.
    ///
    /// A physical index appears once even when explicitly shared between
    /// logical channels.
    pub fn physical_indices(&self) -> BTreeSet<usize> {
        self.bindings.iter().filter_map(|b| b.physical).collect()
    }

    /// Resolve stream columns through the device. Valid only once the
    /// device is streaming. Query failures leave channels degraded.
    pub fn resolve_columns(&mut self, device: &dyn EegDevice) {
        for binding in &mut self.bindings {
            binding.column = match binding.physical {
                Some(physical) => match device.stream_column(physical) {
                    Ok(column) => Some(column),
                    Err(e) => {
                        warn!(channel = %binding.name, physical, error = %e,
                              "stream column query failed, channel degraded");
                        None
                    }
                },
                None => {
                    warn!(channel = %binding.name,
                          "no physical index in channel table, channel degraded");
                    None
                }
            };
        }
    }

    /// Stream column per logical channel, in configured order.
    pub fn columns(&self) -> Vec<Option<usize>> {
        self.bindings.iter().map(|b| b.column).collect()
    }

    /// Logical channel names, in configured order.
    pub fn channel_names(&self) -> Vec<String> {
        self.bindings.iter().map(|b| b.name.clone()).collect()
    }

    /// Names of channels with no resolvable stream column.
    pub fn degraded_channels(&self) -> Vec<&str> {
        self.bindings
            .iter()
            .filter(|b| b.is_degraded())
            .map(|b| b.name.as_str())
            .collect()
    }

    pub fn bindings(&self) -> &[ChannelBinding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_mapping_resolution() {
        let map = ChannelMap::new(&names(&["O1", "O2"]), None).unwrap();
        let bindings = map.bindings();
        assert_eq!(bindings[0].physical, Some(6));
        assert_eq!(bindings[1].physical, Some(7));
        // Columns unresolved until the device is streaming
        assert!(bindings.iter().all(|b| b.is_degraded()));
    }

    #[test]
    fn test_unknown_channel_is_degraded_not_fatal() {
        let map = ChannelMap::new(&names(&["O1", "XX"]), None).unwrap();
        assert_eq!(map.bindings()[1].physical, None);
        assert_eq!(map.degraded_channels(), vec!["XX"]);
    }

    #[test]
    fn test_empty_channel_list_rejected() {
        assert!(ChannelMap::new(&[], None).is_err());
    }

    #[test]
    fn test_shared_physical_index_enabled_once() {
        let mut table = HashMap::new();
        table.insert("A".to_string(), 3);
        table.insert("B".to_string(), 3);
        let map = ChannelMap::new(&names(&["A", "B"]), Some(&table)).unwrap();
        assert_eq!(map.physical_indices().len(), 1);
    }
}
