//! Fact text output
//!
//! Renders records as solver input: one `fact.` statement per record,
//! optionally packed onto lines of bounded width and grouped under a
//! `% FactBase predicate: name/arity` header per record type. JSON export is
//! provided for diagnostics.

use crate::config::FactTextConfig;
use crate::fact_map::FactMap;
use clausal_types::Record;
use std::fmt::Write;

/// Append `records` as fact statements. With a line width, statements are
/// packed onto lines no longer than the width (a single longer statement
/// still gets its own line); without one every statement is on its own line.
pub fn write_facts<'r>(out: &mut String, records: impl IntoIterator<Item = &'r Record>, line_width: Option<usize>) {
    let width = line_width.unwrap_or(0);
    let mut line = String::new();
    for record in records {
        let statement = format!("{record}.");
        if !line.is_empty() && line.len() + statement.len() + 1 > width {
            out.push_str(&line);
            out.push('\n');
            line.clear();
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(&statement);
    }
    if !line.is_empty() {
        out.push_str(&line);
        out.push('\n');
    }
}

/// Render one fact map
pub fn fact_map_text(map: &FactMap, config: &FactTextConfig) -> String {
    let mut out = String::new();
    if config.commented {
        write_header(&mut out, map);
    }
    write_facts(&mut out, map.iter(), config.line_width);
    out
}

/// Render several fact maps; with comments enabled each map gets a header
/// and maps are separated by a blank line
pub fn fact_maps_text<'m>(maps: impl IntoIterator<Item = &'m FactMap>, config: &FactTextConfig) -> String {
    let mut out = String::new();
    if !config.commented {
        write_facts(&mut out, maps.into_iter().flat_map(FactMap::iter), config.line_width);
        return out;
    }
    for (i, map) in maps.into_iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        write_header(&mut out, map);
        write_facts(&mut out, map.iter(), config.line_width);
    }
    out
}

fn write_header(out: &mut String, map: &FactMap) {
    let record_type = map.record_type();
    // writing to a String cannot fail
    let _ = writeln!(out, "% FactBase predicate: {}/{}", record_type.name_or_tuple(), record_type.arity());
}

/// Records as a JSON array
pub fn facts_to_json<'r>(records: impl IntoIterator<Item = &'r Record>) -> serde_json::Result<String> {
    let records: Vec<&Record> = records.into_iter().collect();
    serde_json::to_string(&records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clausal_types::{IntegerCodec, RecordType, Schema, StringCodec, Term};

    fn fixture() -> (RecordType, FactMap) {
        let mut schema = Schema::new();
        let f = schema.define("f").field("anum", IntegerCodec).field("astr", StringCodec).build().unwrap();
        let mut map = FactMap::new(&f);
        for (n, s) in [(1, "a"), (2, "b"), (3, "c")] {
            map.add(f.record(vec![Term::number(n), Term::string(s)]).unwrap()).unwrap();
        }
        (f, map)
    }

    #[test]
    fn test_one_fact_per_line_by_default() {
        let (_, map) = fixture();
        let text = fact_map_text(&map, &FactTextConfig::default());
        assert_eq!(text, "f(1,\"a\").\nf(2,\"b\").\nf(3,\"c\").\n");
    }

    #[test]
    fn test_line_width_packing() {
        let (_, map) = fixture();
        let config = FactTextConfig { line_width: Some(25), commented: false };
        let text = fact_map_text(&map, &config);
        assert_eq!(text, "f(1,\"a\"). f(2,\"b\").\nf(3,\"c\").\n");
        let narrow = FactTextConfig { line_width: Some(3), commented: false };
        assert_eq!(fact_map_text(&map, &narrow).lines().count(), 3);
    }

    #[test]
    fn test_commented_headers() {
        let (_, map) = fixture();
        let mut schema = Schema::new();
        let g = schema.define("g").field("x", IntegerCodec).build().unwrap();
        let mut other = FactMap::new(&g);
        other.add(g.record(vec![Term::number(7)]).unwrap()).unwrap();
        let config = FactTextConfig { line_width: None, commented: true };
        let text = fact_maps_text([&map, &other], &config);
        assert!(text.starts_with("% FactBase predicate: f/2\nf(1,\"a\").\n"));
        assert!(text.ends_with("\n\n% FactBase predicate: g/1\ng(7).\n"));
    }

    #[test]
    fn test_json_export() {
        let (_, map) = fixture();
        let json = facts_to_json(map.iter().take(1)).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["type"], "f");
    }
}
