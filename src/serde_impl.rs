//! Ranges travel as `[min, max]` pairs; the expanded member list is never
//! written. Incoming pairs go through the same validation as
//! [`RangeSet::from_ranges`], so inverted pairs are rejected and overlapping
//! or adjacent ones are merged.

use serde::{Deserialize, Deserializer, Serialize, Serializer, de, ser::SerializeSeq};

use crate::{Range, RangeSet};

impl Serialize for Range {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.min(), self.max()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Range {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (min, max) = <(i32, i32)>::deserialize(deserializer)?;
        Range::try_new(min, max).map_err(de::Error::custom)
    }
}

impl Serialize for RangeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.slots.len()))?;
        for slot in &self.slots {
            seq.serialize_element(&(slot.min, slot.max))?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for RangeSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let pairs = Vec::<(i32, i32)>::deserialize(deserializer)?;
        RangeSet::from_ranges(pairs).map_err(de::Error::custom)
    }
}
