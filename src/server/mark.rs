//! Applying a validated toggle to the target document.

use super::query::ValidatedMark;
use crate::document::marker::set_marker_state;
use crate::document::{DocumentHost, DocumentId, DocumentRef};
use crate::error::{BestEffort, Failure};
use crate::preview::parse_leading_integer;
use crate::session::EditorSession;
use log::{debug, info};

/// Pick the document a source-less request most likely refers to.
///
/// Focused markdown document, then the first visible markdown document,
/// then the last markdown document that had focus, then the first open
/// markdown document.
pub fn resolve_target(host: &dyn DocumentHost, session: &EditorSession) -> Option<DocumentId> {
    let first_markdown =
        |docs: Vec<DocumentRef>| docs.into_iter().find(DocumentRef::is_markdown).map(|d| d.id);

    host.active_document()
        .filter(DocumentRef::is_markdown)
        .map(|d| d.id)
        .or_else(|| first_markdown(host.visible_documents()))
        .or_else(|| session.last_markdown_document())
        .or_else(|| first_markdown(host.open_documents()))
}

/// Rewrite the checkbox marker on the requested line and save.
///
/// Every failure here is a [`Failure::Resolution`]; the caller logs and
/// absorbs it. Returns the edited document.
pub fn apply_mark(
    host: &dyn DocumentHost,
    session: &EditorSession,
    mark: &ValidatedMark,
) -> BestEffort<DocumentId> {
    let id = if mark.source.is_empty() {
        resolve_target(host, session)
            .ok_or_else(|| Failure::Resolution("no markdown document to edit".to_string()))?
    } else {
        DocumentId::parse(&mark.source)?
    };

    host.open_document(&id)?;
    let line_count = host.line_count(&id)?;

    let line = parse_leading_integer(&mark.line)
        .ok_or_else(|| Failure::Resolution(format!("unparsable line number '{}'", mark.line)))?;
    let index = match usize::try_from(line - 1) {
        Ok(index) if index < line_count => index,
        _ => {
            return Err(Failure::Resolution(format!(
                "line {} out of bounds in {} ({} lines)",
                line, id, line_count
            )))
        }
    };

    let text = host.line_at(&id, index)?;
    let Some(updated) = set_marker_state(&text, mark.checked) else {
        debug!("No checkbox on line {} of {}", line, id);
        return Ok(id);
    };

    if !host.replace_line(&id, index, &updated)? {
        return Err(Failure::Resolution(format!("edit to {} was rejected", id)));
    }
    host.save(&id)?;

    info!(
        "Marked line {} of {} as {}",
        line,
        id,
        if mark.checked { "checked" } else { "unchecked" }
    );
    Ok(id)
}
