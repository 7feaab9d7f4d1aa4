//! Bone graph construction and the per-frame wire message.
//!
//! A bone is a named head/tail pair of landmark indices. The table below is the
//! contract with the client rig (bone names match the model's armature), so it
//! is kept exactly as the client expects it, including the "17-13" connector
//! and the absence of a wrist-to-middle bone.

use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::hand::error::PoseError;
use crate::hand::landmark::{HandPose, Landmark, PixelPoint};

/// Number of bones in every frame message.
pub const BONE_COUNT: usize = 20;

/// Static definition of one bone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoneDef {
    pub name: &'static str,
    /// Landmark index the bone points to.
    pub head: usize,
    /// Landmark index the bone starts from.
    pub tail: usize,
}

const fn bone(name: &'static str, head: usize, tail: usize) -> BoneDef {
    BoneDef { name, head, tail }
}

/// The bone table, in wire order.
pub const BONES: [BoneDef; BONE_COUNT] = [
    bone("0-1", 1, 0),
    bone("1-2", 2, 1),
    bone("2-3", 3, 2),
    bone("3-4", 4, 3),
    bone("0-5", 5, 0),
    bone("5-6", 6, 5),
    bone("6-7", 7, 6),
    bone("7-8", 8, 7),
    bone("5-9", 9, 5),
    bone("9-10", 10, 9),
    bone("10-11", 11, 10),
    bone("11-12", 12, 11),
    bone("0-17", 17, 0),
    bone("17-13", 13, 17),
    bone("13-14", 14, 13),
    bone("14-15", 15, 14),
    bone("15-16", 16, 15),
    bone("17-18", 18, 17),
    bone("18-19", 19, 18),
    bone("19-20", 20, 19),
];

/// Bone names in table order.
pub static BONE_NAMES: [&str; BONE_COUNT] = {
    let mut names = [""; BONE_COUNT];
    let mut i = 0;
    while i < BONE_COUNT {
        names[i] = BONES[i].name;
        i += 1;
    }
    names
};

/// Position of a bone in [`BONES`].
pub fn bone_index(name: &str) -> Option<usize> {
    BONES.iter().position(|def| def.name == name)
}

/// One end of a bone. Serialised with `z` fixed at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "WireJoint", into = "WireJoint")]
pub struct Joint {
    pub x: u32,
    pub y: u32,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireJoint {
    x: u32,
    y: u32,
    z: i64,
}

impl From<Joint> for WireJoint {
    fn from(joint: Joint) -> Self {
        Self {
            x: joint.x,
            y: joint.y,
            z: 0,
        }
    }
}

impl TryFrom<WireJoint> for Joint {
    type Error = String;

    fn try_from(wire: WireJoint) -> Result<Self, Self::Error> {
        if wire.z != 0 {
            return Err(format!("joint depth must be 0, got {}", wire.z));
        }
        Ok(Self {
            x: wire.x,
            y: wire.y,
        })
    }
}

impl From<PixelPoint> for Joint {
    fn from(p: PixelPoint) -> Self {
        Self { x: p.x, y: p.y }
    }
}

/// A resolved bone segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Bone {
    pub head: Joint,
    pub tail: Joint,
}

/// All bones of one hand in one frame: the unit sent to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoneFrame {
    bones: [Bone; BONE_COUNT],
}

impl BoneFrame {
    /// Resolve every bone in the table against a complete pose.
    pub fn from_pose(pose: &HandPose) -> Self {
        Self {
            bones: BONES.map(|def| Bone {
                head: pose.point(def.head).into(),
                tail: pose.point(def.tail).into(),
            }),
        }
    }

    /// Look up a bone by name.
    pub fn get(&self, name: &str) -> Option<&Bone> {
        bone_index(name).map(|i| &self.bones[i])
    }

    /// Iterate `(name, bone)` pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Bone)> + '_ {
        BONE_NAMES.iter().copied().zip(self.bones.iter())
    }

    /// Serialise to the JSON text sent over the wire.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Build the frame message for one hand's pixel landmarks.
///
/// Fails closed: anything short of a complete 21-point pose yields an error
/// and no partial message.
pub fn build_bone_frame(landmarks: &[Landmark]) -> Result<BoneFrame, PoseError> {
    HandPose::from_landmarks(landmarks).map(|pose| BoneFrame::from_pose(&pose))
}

impl Serialize for BoneFrame {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(BONE_COUNT))?;
        for (name, bone) in self.iter() {
            map.serialize_entry(name, bone)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for BoneFrame {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(BoneFrameVisitor)
    }
}

struct BoneFrameVisitor;

impl<'de> Visitor<'de> for BoneFrameVisitor {
    type Value = BoneFrame;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a map of all {BONE_COUNT} hand bones")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut slots: [Option<Bone>; BONE_COUNT] = [None; BONE_COUNT];
        while let Some(name) = access.next_key::<String>()? {
            let index =
                bone_index(&name).ok_or_else(|| de::Error::unknown_field(&name, &BONE_NAMES))?;
            if slots[index].is_some() {
                return Err(de::Error::duplicate_field(BONES[index].name));
            }
            slots[index] = Some(access.next_value()?);
        }

        if let Some(missing) = slots.iter().position(Option::is_none) {
            return Err(de::Error::missing_field(BONES[missing].name));
        }
        Ok(BoneFrame {
            bones: slots.map(Option::unwrap_or_default),
        })
    }
}
