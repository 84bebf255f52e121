// Copyright (c) 2025 - Cowboy AI, Inc.
//! Logical Ids, Construct Paths and Lazy References
//!
//! Values that only exist once the provisioning engine has created a resource
//! (instance ids, ARNs, endpoint service names) are never available while the
//! topology is declared. They are modelled as [`Token`]s: typed placeholders
//! rendered as CloudFormation intrinsics and resolved by the engine at apply
//! time.
//!
//! ```rust
//! use privatelink_topology::token::{LogicalId, Token};
//!
//! let id = LogicalId::new("ProducerEC2").unwrap();
//! let token = Token::Ref(id);
//! assert_eq!(serde_json::to_string(&token).unwrap(), r#"{"Ref":"ProducerEC2"}"#);
//! ```

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;

use crate::errors::{TopologyError, TopologyResult};

/// Construct path segments hidden from logical ids
const HIDDEN_SEGMENTS: [&str; 2] = ["Resource", "Default"];

/// Hierarchical construct path (`Stack/Vpc/PublicSubnet1/Subnet`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConstructPath(Vec<String>);

impl ConstructPath {
    /// Root path of a stack
    pub fn root(stack_name: impl Into<String>) -> Self {
        Self(vec![stack_name.into()])
    }

    /// Path of a child construct
    pub fn child(&self, id: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(id.into());
        Self(segments)
    }

    /// Logical id derived from this path
    ///
    /// The stack segment and hidden segments (`Resource`, `Default`) are
    /// dropped, the rest is concatenated with non-alphanumerics removed.
    pub fn logical_id(&self) -> TopologyResult<LogicalId> {
        let id: String = self
            .0
            .iter()
            .skip(1)
            .filter(|segment| !HIDDEN_SEGMENTS.contains(&segment.as_str()))
            .flat_map(|segment| segment.chars().filter(|c| c.is_ascii_alphanumeric()))
            .collect();

        LogicalId::new(id).map_err(|_| TopologyError::InvalidLogicalId(self.to_string()))
    }
}

impl fmt::Display for ConstructPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

/// CloudFormation logical id
///
/// Invariants:
/// - Non-empty, at most 255 characters
/// - ASCII alphanumeric only
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalId(String);

impl LogicalId {
    /// Maximum logical id length accepted by CloudFormation
    pub const MAX_LENGTH: usize = 255;

    /// Create a logical id with validation
    pub fn new(id: impl Into<String>) -> TopologyResult<Self> {
        let id = id.into();

        if id.is_empty() || id.len() > Self::MAX_LENGTH {
            return Err(TopologyError::InvalidLogicalId(id));
        }

        if !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(TopologyError::InvalidLogicalId(id));
        }

        Ok(Self(id))
    }

    /// Get the logical id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pseudo parameters supplied by the provisioning engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PseudoParameter {
    Region,
    AccountId,
    Partition,
    UrlSuffix,
}

impl PseudoParameter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Region => "AWS::Region",
            Self::AccountId => "AWS::AccountId",
            Self::Partition => "AWS::Partition",
            Self::UrlSuffix => "AWS::URLSuffix",
        }
    }
}

/// A value that may only be known at apply time
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    /// Plain string known at declaration time
    Literal(String),

    /// Primary identifier of a declared resource (`Ref`)
    Ref(LogicalId),

    /// Named attribute of a declared resource (`Fn::GetAtt`)
    GetAtt { logical_id: LogicalId, attribute: String },

    /// Engine-supplied pseudo parameter
    Pseudo(PseudoParameter),

    /// Availability zones of the deployment region (`Fn::GetAZs`)
    AvailabilityZones,

    /// Element of a list-valued token (`Fn::Select`)
    Select { index: usize, list: Box<Token> },

    /// Concatenation of tokens (`Fn::Join`)
    Join { delimiter: String, parts: Vec<Token> },

    /// Base64 encoding done by the engine (`Fn::Base64`)
    Base64(Box<Token>),
}

impl Token {
    pub fn literal(value: impl Into<String>) -> Self {
        Token::Literal(value.into())
    }

    /// Availability zone at `index` in the deployment region
    pub fn availability_zone(index: usize) -> Self {
        Token::Select {
            index,
            list: Box::new(Token::AvailabilityZones),
        }
    }

    /// Whether the value is fully known at declaration time
    pub fn is_resolved(&self) -> bool {
        match self {
            Token::Literal(_) => true,
            Token::Join { parts, .. } => parts.iter().all(Token::is_resolved),
            Token::Base64(inner) => inner.is_resolved(),
            _ => false,
        }
    }

    /// Logical ids this token depends on
    pub fn references(&self) -> Vec<&LogicalId> {
        match self {
            Token::Ref(id) | Token::GetAtt { logical_id: id, .. } => vec![id],
            Token::Select { list, .. } | Token::Base64(list) => list.references(),
            Token::Join { parts, .. } => parts.iter().flat_map(Token::references).collect(),
            Token::Literal(_) | Token::Pseudo(_) | Token::AvailabilityZones => Vec::new(),
        }
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Token::Literal(value.to_string())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Token::Literal(value)
    }
}

impl Serialize for Token {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Token::Literal(value) => serializer.serialize_str(value),
            Token::Ref(id) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Ref", id)?;
                map.end()
            }
            Token::GetAtt {
                logical_id,
                attribute,
            } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::GetAtt", &[logical_id.as_str(), attribute.as_str()])?;
                map.end()
            }
            Token::Pseudo(param) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Ref", param.as_str())?;
                map.end()
            }
            Token::AvailabilityZones => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::GetAZs", "")?;
                map.end()
            }
            Token::Select { index, list } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::Select", &(index, list))?;
                map.end()
            }
            Token::Join { delimiter, parts } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::Join", &(delimiter, parts))?;
                map.end()
            }
            Token::Base64(inner) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::Base64", inner)?;
                map.end()
            }
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Literal(value) => write!(f, "{}", value),
            Token::Ref(id) => write!(f, "${{{}}}", id),
            Token::GetAtt {
                logical_id,
                attribute,
            } => write!(f, "${{{}.{}}}", logical_id, attribute),
            Token::Pseudo(param) => write!(f, "${{{}}}", param.as_str()),
            Token::AvailabilityZones => write!(f, "${{AZs}}"),
            Token::Select { index, list } => write!(f, "{}[{}]", list, index),
            Token::Join { delimiter, parts } => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{}", delimiter)?;
                    }
                    write!(f, "{}", part)?;
                }
                Ok(())
            }
            Token::Base64(inner) => write!(f, "base64({})", inner),
        }
    }
}

/// Typed lazy reference to a declared resource
///
/// The type parameter records what kind of construct the logical id belongs
/// to, so a target group cannot be handed a subnet where it expects an
/// instance. Nothing is resolved until the engine applies the template.
pub struct Reference<T> {
    logical_id: LogicalId,
    _kind: PhantomData<fn() -> T>,
}

impl<T> Reference<T> {
    pub(crate) fn new(logical_id: LogicalId) -> Self {
        Self {
            logical_id,
            _kind: PhantomData,
        }
    }

    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    /// `Ref` to the referenced resource
    pub fn to_ref(&self) -> Token {
        Token::Ref(self.logical_id.clone())
    }

    /// `Fn::GetAtt` of the referenced resource
    pub fn get_att(&self, attribute: impl Into<String>) -> Token {
        Token::GetAtt {
            logical_id: self.logical_id.clone(),
            attribute: attribute.into(),
        }
    }
}

impl<T> Clone for Reference<T> {
    fn clone(&self) -> Self {
        Self::new(self.logical_id.clone())
    }
}

impl<T> PartialEq for Reference<T> {
    fn eq(&self, other: &Self) -> bool {
        self.logical_id == other.logical_id
    }
}

impl<T> Eq for Reference<T> {}

impl<T> fmt::Debug for Reference<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Reference").field(&self.logical_id).finish()
    }
}
