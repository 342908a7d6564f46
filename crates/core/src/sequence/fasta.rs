//! FASTA text parsing.

use regex_lite::Regex;

use super::types::TargetSequence;

/// Extract the cluster label from a record name.
///
/// Record names like `cluster_3_medoid` yield `Some("3")`.
pub fn extract_cluster_label(name: &str) -> Option<String> {
    let pattern = Regex::new(r"cluster_(\d+)").expect("invalid cluster pattern");
    pattern
        .captures(name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Parse FASTA text into target sequences.
///
/// Residue lines are cleaned to the characters the modeling service
/// accepts (`A-Z`, `a-z`, `?`, `-`); records that end up with an empty
/// residue string are dropped.
pub fn parse_sequences(input: &str) -> Vec<TargetSequence> {
    let invalid = Regex::new(r"[^A-Za-z?-]").expect("invalid residue pattern");

    let mut sequences: Vec<(String, String)> = Vec::new();
    for line in input.lines() {
        let line = line.trim();
        if let Some(name) = line.strip_prefix('>') {
            sequences.push((name.trim().to_string(), String::new()));
        } else if let Some((_, residues)) = sequences.last_mut() {
            residues.push_str(&invalid.replace_all(line, ""));
        }
    }

    sequences
        .into_iter()
        .filter(|(_, residues)| !residues.is_empty())
        .map(|(name, residues)| {
            let cluster_label = extract_cluster_label(&name);
            TargetSequence::new(name, residues, cluster_label)
        })
        .collect()
}
