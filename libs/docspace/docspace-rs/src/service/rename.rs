use tracing::*;

use crate::model::entry::Entry;
use crate::model::errors::{DsErr, DsErrKind, DsResult};
use crate::model::privilege::RawPrivilege;
use crate::service::listing::ListingContext;
use crate::DocSpace;

pub fn validate_name(name: &str) -> DsResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DsErrKind::FileNameEmpty.into());
    }
    if name.contains('/') {
        return Err(DsErrKind::FileNameContainsSlash.into());
    }
    Ok(name)
}

impl DocSpace {
    /// Renames `entry` in place. The view listing it is flagged for refetch
    /// whatever the outcome; its cursors are kept since its identity did not change.
    #[instrument(level = "debug", skip(self, context, entry), fields(key = %entry.key), err(Debug))]
    pub async fn rename(
        &self, context: &ListingContext, entry: &Entry, new_name: &str,
    ) -> DsResult<()> {
        let new_name = validate_name(new_name)?;
        self.require(entry.space_id, RawPrivilege::Write)?;

        if new_name == entry.key {
            return Ok(());
        }

        let result = self
            .remote
            .rename(entry.space_id, &entry.path, &entry.key, new_name)
            .await
            .map_err(DsErr::from);

        context.invalidate();

        if let Err(err) = &result {
            // conflicts carry the server's reason, which is what the user should read
            self.events.error(&err.kind);
        } else {
            info!("renamed to {new_name}");
        }
        result
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn names_are_trimmed_and_checked() {
        assert_eq!(validate_name("  q1.pdf ").unwrap(), "q1.pdf");
        assert_eq!(validate_name("   ").unwrap_err().kind, DsErrKind::FileNameEmpty);
        assert_eq!(validate_name("a/b").unwrap_err().kind, DsErrKind::FileNameContainsSlash);
    }
}
