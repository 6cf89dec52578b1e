//! Slot assignment for a tracking session.

use std::collections::HashMap;
use std::sync::Arc;

use super::error::TrackingError;
use crate::marker::{MarkerDescriptor, MarkerId};

/// Ordered markers registered with the provider for one session.
///
/// Slot `i` is the provider's reference image index `i`. The mapping is fixed
/// at construction and is a bijection between slots and marker ids.
#[derive(Debug, Clone)]
pub struct TrackingSlots {
    markers: Vec<Arc<MarkerDescriptor>>,
    by_id: HashMap<MarkerId, usize>,
}

impl TrackingSlots {
    /// Assign slots in the given order.
    ///
    /// Fails with [`TrackingError::Init`] on an empty list, a duplicate id, or
    /// a non-positive physical width.
    pub fn new(markers: Vec<MarkerDescriptor>) -> Result<Self, TrackingError> {
        if markers.is_empty() {
            return Err(TrackingError::Init("no markers to track".to_string()));
        }

        let mut by_id = HashMap::with_capacity(markers.len());
        for (slot, marker) in markers.iter().enumerate() {
            if !marker.has_valid_width() {
                return Err(TrackingError::Init(format!(
                    "marker {} has invalid physical width {}",
                    marker.id, marker.physical_width_m
                )));
            }
            if by_id.insert(marker.id.clone(), slot).is_some() {
                return Err(TrackingError::Init(format!(
                    "marker {} registered twice",
                    marker.id
                )));
            }
        }

        Ok(Self {
            markers: markers.into_iter().map(Arc::new).collect(),
            by_id,
        })
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Marker registered at `slot`, if any.
    pub fn get(&self, slot: usize) -> Option<&Arc<MarkerDescriptor>> {
        self.markers.get(slot)
    }

    /// Slot of a marker id.
    pub fn slot_of(&self, id: &MarkerId) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    /// Markers in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<MarkerDescriptor>> {
        self.markers.iter()
    }
}
