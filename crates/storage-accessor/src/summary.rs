//! Side-effect free enumeration of declared variables.

use std::fmt;

use alloy_primitives::U256;
use serde::Serialize;
use storage_layout::Schema;

/// One declared state variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableSummary {
    pub label: String,
    pub contract: String,
    pub slot: U256,
    pub offset: usize,
    pub bytes: usize,
    /// Type label, e.g. `mapping(address => uint256)`.
    #[serde(rename = "type")]
    pub ty: String,
    /// Category of the type, e.g. `mapping`.
    pub kind: &'static str,
}

pub fn list_variables(schema: &Schema) -> Vec<VariableSummary> {
    schema
        .variables()
        .map(|variable| {
            let descriptor = schema.ty(variable.ty);
            VariableSummary {
                label: variable.label.clone(),
                contract: variable.contract.clone(),
                slot: variable.slot,
                offset: variable.offset,
                bytes: descriptor.number_of_bytes,
                ty: descriptor.label.clone(),
                kind: descriptor.kind.category(),
            }
        })
        .collect()
}

/// Formats summaries as an aligned text table, one variable per row.
pub struct VariableTable<'a>(pub &'a [VariableSummary]);

impl fmt::Display for VariableTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const HEADERS: [&str; 4] = ["name", "slot", "offset", "type"];

        let rows: Vec<[String; 4]> = self
            .0
            .iter()
            .map(|v| {
                [
                    v.label.clone(),
                    v.slot.to_string(),
                    v.offset.to_string(),
                    v.ty.clone(),
                ]
            })
            .collect();

        let mut widths = HEADERS.map(str::len);
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.len());
            }
        }

        let [name_w, slot_w, offset_w, _] = widths;
        writeln!(
            f,
            "{:<name_w$}  {:>slot_w$}  {:>offset_w$}  {}",
            HEADERS[0], HEADERS[1], HEADERS[2], HEADERS[3]
        )?;
        for [name, slot, offset, ty] in &rows {
            writeln!(f, "{name:<name_w$}  {slot:>slot_w$}  {offset:>offset_w$}  {ty}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(label: &str, slot: u64, offset: usize, ty: &str) -> VariableSummary {
        VariableSummary {
            label: label.to_string(),
            contract: "Test".to_string(),
            slot: U256::from(slot),
            offset,
            bytes: 32,
            ty: ty.to_string(),
            kind: "scalar",
        }
    }

    #[test]
    fn test_table_alignment() {
        let rows = [
            summary("lock", 0, 0, "uint8"),
            summary("commissionBp", 0, 21, "uint16"),
            summary("numbers", 13, 0, "uint256[]"),
        ];

        let table = VariableTable(&rows).to_string();
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "name          slot  offset  type");
        assert_eq!(lines[1], "lock             0       0  uint8");
        assert_eq!(lines[2], "commissionBp     0      21  uint16");
        assert_eq!(lines[3], "numbers         13       0  uint256[]");
    }

    #[test]
    fn test_serializes_type_field() {
        let json = serde_json::to_value(summary("lock", 0, 0, "uint8")).unwrap();
        assert_eq!(json["type"], "uint8");
        assert_eq!(json["slot"], "0x0");
    }
}
