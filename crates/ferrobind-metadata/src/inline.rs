//! Inline textual metadata
//!
//! Types registered at run time carry a small line-oriented description
//! instead of a value-table record:
//!
//! ```text
//! C com/example/Generated
//! B java/lang/Object
//! M run ()V 0
//! M compare (Ljava/lang/Object;Ljava/lang/Object;)I 2
//! F count I 0
//! ```
//!
//! The first line gives the kind (`C` class, `I` interface) and optionally
//! the name, the second line optionally names the base type. Remaining lines
//! declare instance methods (`M`) and instance fields (`F`). The parser
//! yields the same [`TypeMembers`] the binary path produces.

use crate::entry::{MetadataEntry, NodeKind, TypeMembers};
use crate::error::{MetadataError, MetadataResult};

/// A parsed inline type description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineType {
    /// Class or interface
    pub kind: NodeKind,
    /// Declared name, if present
    pub name: Option<String>,
    /// Declared base type, if present
    pub base: Option<String>,
    /// Instance methods and fields
    pub members: TypeMembers,
}

/// Parse an inline metadata blob
pub fn parse_inline(text: &str) -> MetadataResult<InlineType> {
    let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l.trim()));

    let (line_no, header) = lines.next().ok_or_else(|| syntax(1, "missing type line"))?;
    let mut parts = header.split_whitespace();
    let kind = match parts.next() {
        Some("C") => NodeKind::Class,
        Some("I") => NodeKind::Interface,
        Some(other) => return Err(syntax(line_no, &format!("unknown type marker '{other}'"))),
        None => return Err(syntax(line_no, "missing type marker")),
    };
    let name = parts.next().map(str::to_string);

    let (line_no, base_line) = lines.next().ok_or_else(|| syntax(2, "missing base line"))?;
    let mut parts = base_line.split_whitespace();
    if parts.next() != Some("B") {
        return Err(syntax(line_no, "expected base marker 'B'"));
    }
    let base = parts.next().map(str::to_string);

    let mut members = TypeMembers::default();
    for (line_no, line) in lines {
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 4 {
            return Err(syntax(line_no, "expected '<M|F> name signature paramCount'"));
        }
        let param_count: usize = fields[3]
            .parse()
            .map_err(|_| syntax(line_no, &format!("invalid parameter count '{}'", fields[3])))?;
        match fields[0] {
            "M" => members
                .instance_methods
                .push(MetadataEntry::method(fields[1], fields[2], param_count)),
            "F" => members.instance_fields.push(MetadataEntry::field(fields[1], fields[2])),
            other => return Err(syntax(line_no, &format!("unknown member marker '{other}'"))),
        }
    }

    Ok(InlineType {
        kind,
        name,
        base,
        members,
    })
}

fn syntax(line: usize, message: &str) -> MetadataError {
    MetadataError::InlineSyntax {
        line,
        message: message.to_string(),
    }
}
