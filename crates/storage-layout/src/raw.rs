//! Serde model of the storage layout emitted by solc.
//!
//! Accepts both the bare `{ "storage": [...], "types": {...} }` object written
//! by layout exporters and the `solc --combined-json storage-layout` envelope.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{LayoutError, Result};

/// Represents the full compiler output.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SolcOutput {
    contracts: IndexMap<String, ContractOutput>,
}

/// Represents the full compiler output for a given contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ContractOutput {
    #[serde(rename = "storage-layout")]
    storage_layout: StorageLayout,
}

/// Represents the storage layout for a contract.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StorageLayout {
    pub storage: Vec<StorageVariable>,
    /// solc writes `null` here for contracts without state variables.
    #[serde(default, deserialize_with = "null_as_default")]
    pub types: IndexMap<String, TypeDefinition>,
}

/// Represents a storage layout variable from solc's JSON output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageVariable {
    /// Contract name
    #[serde(default)]
    pub contract: String,
    /// Variable name
    pub label: String,
    /// Storage slot number, as a decimal string
    pub slot: String,
    /// Byte offset within the storage slot
    pub offset: u64,
    /// Type identifier: "t_uint256", "t_mapping(t_address,t_uint256)"
    #[serde(rename = "type")]
    pub ty: String,
}

/// Represents a type definition from Solidity compiler output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TypeDefinition {
    /// Encoding type: "inplace", "mapping", "dynamic_array", "bytes"
    pub encoding: String,

    /// Human-readable label
    pub label: String,

    /// Number of bytes this type occupies
    #[serde(rename = "numberOfBytes")]
    pub number_of_bytes: String,

    /// Element type for arrays
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,

    /// Key type for mappings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Value type for mappings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Struct members
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<StorageVariable>>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl StorageLayout {
    /// Parses a bare `{storage, types}` layout document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parses `solc --combined-json storage-layout` output.
    ///
    /// With `contract = None` the first contract is returned. Otherwise the
    /// contract is matched either by its full `path:Name` key or by `Name`.
    pub fn from_solc_combined_json(json: &str, contract: Option<&str>) -> Result<Self> {
        let output: SolcOutput = serde_json::from_str(json)?;

        let selected = match contract {
            None => output.contracts.into_values().next(),
            Some(name) => output
                .contracts
                .into_iter()
                .find(|(key, _)| {
                    key == name || key.rsplit_once(':').is_some_and(|(_, short)| short == name)
                })
                .map(|(_, contract)| contract),
        };

        match (selected, contract) {
            (Some(contract), _) => Ok(contract.storage_layout),
            (None, Some(name)) => Err(LayoutError::MissingContract(name.to_string())),
            (None, None) => Err(LayoutError::NoContracts),
        }
    }

    /// Loads a layout file from disk, accepting either document shape.
    pub fn read_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| LayoutError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let document: serde_json::Value = serde_json::from_str(&content)?;
        if document.get("contracts").is_some() {
            Self::from_solc_combined_json(&content, None)
        } else {
            Ok(serde_json::from_value(document)?)
        }
    }
}
