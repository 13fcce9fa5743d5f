/// Splits a loaded document into retrievable text pieces. Policy is decided
/// purely by the source reference (file name / canonicalized path) and the
/// content; no I/O happens here. Rules are tried in order; the first match
/// wins.
pub fn split(source_reference: &str, content: &str) -> Vec<String> {
    if source_reference.ends_with(".md") {
        return split_markdown_h2(content);
    }
    if source_reference.ends_with("_docs.txt") {
        return split_on_rule(content);
    }
    if is_external_task_reference(source_reference) {
        return split_no_split(content);
    }
    split_on_issue_token(content)
}

fn is_external_task_reference(source_reference: &str) -> bool {
    let file_name = source_reference.rsplit('/').next().unwrap_or(source_reference);
    file_name.starts_with("clickup_")
}

/// `*.md`: split on lines starting with `## ` (Markdown H2), keeping the
/// heading line attached to the section that follows it. Any text before
/// the first H2 becomes its own leading chunk.
fn split_markdown_h2(content: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in content.lines() {
        if line.starts_with("## ") && !current.trim().is_empty() {
            chunks.push(current.trim().to_string());
            current.clear();
        }
        current.push_str(line);
        current.push('\n');
    }
    if !current.trim().is_empty() {
        chunks.push(current.trim().to_string());
    }
    chunks
}

/// `*_docs.txt`: split on lines that are exactly `---`.
fn split_on_rule(content: &str) -> Vec<String> {
    content
        .split("\n---\n")
        .map(|piece| piece.trim().to_string())
        .filter(|piece| !piece.is_empty())
        .collect()
}

/// External-task canonicalized files are emitted whole, as a single chunk
/// representing one incident.
fn split_no_split(content: &str) -> Vec<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        Vec::new()
    } else {
        vec![trimmed.to_string()]
    }
}

/// Default support-ticket policy: split on the literal token "Issue" and
/// re-prepend it to every non-empty piece, so each piece reads as a
/// standalone incident again.
fn split_on_issue_token(content: &str) -> Vec<String> {
    content
        .split("Issue")
        .map(|piece| format!("Issue{piece}"))
        .filter(|piece| !piece.trim().eq("Issue"))
        .map(|piece| piece.trim().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_splits_on_h2_keeping_heading() {
        let content = "# Title\nintro text\n## First\nfirst body\n## Second\nsecond body\n";
        let chunks = split("guide.md", content);
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].starts_with("# Title"));
        assert!(chunks[1].starts_with("## First"));
        assert!(chunks[2].starts_with("## Second"));
    }

    #[test]
    fn docs_txt_splits_on_dash_rule() {
        let content = "first entry\n---\nsecond entry\n---\nthird entry";
        let chunks = split("support_docs.txt", content);
        assert_eq!(chunks, vec!["first entry", "second entry", "third entry"]);
    }

    #[test]
    fn clickup_reference_is_never_split() {
        let content = "Task ID: 42\nIssue: cannot export\nProblem: driver missing\nSolution:\nenable it";
        let chunks = split(
            "workspaces/w1/clickup_42.txt",
            content,
        );
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], content);
    }

    #[test]
    fn default_splits_on_issue_token() {
        let content = "IssueA login failureIssueB export failure";
        let chunks = split("tickets.txt", content);
        assert_eq!(chunks, vec!["IssueA login failure", "IssueB export failure"]);
    }

    #[test]
    fn default_policy_keeps_leading_text_before_first_issue_as_its_own_chunk() {
        let content = "preamble not part of any ticketIssueA real ticket";
        let chunks = split("tickets.txt", content);
        assert_eq!(
            chunks,
            vec!["Issuepreamble not part of any ticket", "IssueA real ticket"]
        );
    }
}
