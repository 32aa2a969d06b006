use serde::{Deserialize, Serialize};
use tracing::*;
use uuid::Uuid;

use crate::model::entry::SpaceId;
use crate::model::errors::{DsErr, DsErrKind, DsResult};
use crate::model::member::Member;
use crate::model::privilege::{grants_for, highest_tier, PrivilegeTier, RawPrivilege};
use crate::service::archive::BatchOutcome;
use crate::DocSpace;

/// A member as shown in the membership table of a space.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MemberSummary {
    pub member: Member,
    /// `None` when the member holds no explicit grant.
    pub tier: Option<PrivilegeTier>,
}

/// One line of a bulk membership upload.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MembershipRow {
    pub line: usize,
    /// Member name or id.
    pub member: String,
    pub tier: PrivilegeTier,
}

/// Parses `member,tier` records. A `member,tier` header on the first row,
/// blank lines and `#` comments are skipped. Fields may be quoted.
pub fn parse_membership_csv(text: &str) -> DsResult<Vec<MembershipRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    let mut first = true;
    for record in reader.records() {
        let record = record.map_err(|err| -> DsErr {
            let line = err.position().map_or(0, |pos| pos.line() as usize);
            DsErrKind::CsvInvalid { line, reason: err.to_string() }.into()
        })?;
        if record.iter().all(str::is_empty) {
            continue;
        }

        let line = record.position().map_or(0, |pos| pos.line() as usize);
        let invalid = |reason: &str| -> DsErr {
            DsErrKind::CsvInvalid { line, reason: reason.to_string() }.into()
        };

        if record.len() != 2 {
            return Err(invalid("expected two columns: member,tier"));
        }
        let (member, tier) = (&record[0], &record[1]);
        if std::mem::take(&mut first)
            && member.eq_ignore_ascii_case("member")
            && tier.eq_ignore_ascii_case("tier")
        {
            continue;
        }
        if member.is_empty() {
            return Err(invalid("member is empty"));
        }
        let tier = tier
            .parse::<PrivilegeTier>()
            .map_err(|_| invalid("tier must be VIEWER, EDITOR or ADMIN"))?;

        rows.push(MembershipRow { line, member: member.to_string(), tier });
    }
    Ok(rows)
}

fn find_member<'a>(members: &'a [Member], key: &str) -> Option<&'a Member> {
    let id = Uuid::parse_str(key).ok();
    members
        .iter()
        .find(|m| Some(m.id) == id || m.name == key)
}

impl DocSpace {
    #[instrument(level = "debug", skip(self), err(Debug))]
    pub async fn members(&self, space_id: SpaceId) -> DsResult<Vec<MemberSummary>> {
        let members = self
            .remote
            .get_members(space_id)
            .await
            .map_err(DsErr::from)?;
        Ok(members
            .into_iter()
            .map(|member| MemberSummary { tier: highest_tier(&member), member })
            .collect())
    }

    /// Gives `member_id` exactly the grants of `tier` in `space_id`.
    #[instrument(level = "debug", skip(self), err(Debug))]
    pub async fn set_member_tier(
        &self, space_id: SpaceId, member_id: Uuid, tier: PrivilegeTier,
    ) -> DsResult<()> {
        self.require(space_id, RawPrivilege::Membership)?;
        let result = self
            .remote
            .set_member_privileges(space_id, member_id, &grants_for(tier))
            .await
            .map_err(DsErr::from);
        if let Err(err) = &result {
            self.events.error(&err.kind);
        }
        result
    }

    /// Applies a bulk membership upload to `space_id`. Rows naming unknown
    /// members, or rejected by the server, are reported per row; the others
    /// still apply.
    #[instrument(level = "debug", skip(self, csv), err(Debug))]
    pub async fn apply_membership_csv(&self, space_id: SpaceId, csv: &str) -> DsResult<BatchOutcome> {
        let rows = parse_membership_csv(csv)?;
        self.require(space_id, RawPrivilege::Membership)?;

        let members = self
            .remote
            .get_members(space_id)
            .await
            .map_err(DsErr::from)?;

        let mut outcome = BatchOutcome::default();
        for row in rows {
            let target = format!("line {}: {}", row.line, row.member);
            let result = match find_member(&members, &row.member) {
                Some(member) => self
                    .remote
                    .set_member_privileges(space_id, member.id, &grants_for(row.tier))
                    .await
                    .map_err(DsErr::from),
                None => Err(DsErrKind::MemberNotFound(row.member.clone()).into()),
            };
            outcome.record(target, result);
        }

        for failure in &outcome.failed {
            warn!(failed = %failure.target, "membership row not applied: {:?}", failure.error);
            self.events.error(&failure.error);
        }
        info!(succeeded = outcome.succeeded, failed = outcome.failed.len(), "membership upload");
        Ok(outcome)
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn parses_rows_with_header_and_comments() {
        let rows = parse_membership_csv(
            "member,tier\n\n# reviewers\nalex,viewer\n\"jordan\", ADMIN \nci-bot,Editor\n",
        )
        .unwrap();
        let parsed: Vec<(usize, &str, PrivilegeTier)> = rows
            .iter()
            .map(|r| (r.line, r.member.as_str(), r.tier))
            .collect();
        assert_eq!(
            parsed,
            [
                (4, "alex", PrivilegeTier::Viewer),
                (5, "jordan", PrivilegeTier::Admin),
                (6, "ci-bot", PrivilegeTier::Editor)
            ]
        );
    }

    #[test]
    fn reports_the_offending_line() {
        let err = parse_membership_csv("alex,viewer\nsam,owner\n").unwrap_err();
        assert_eq!(
            err.kind,
            DsErrKind::CsvInvalid {
                line: 2,
                reason: "tier must be VIEWER, EDITOR or ADMIN".to_string()
            }
        );

        let err = parse_membership_csv("alex\n").unwrap_err();
        assert!(matches!(err.kind, DsErrKind::CsvInvalid { line: 1, .. }));

        let err = parse_membership_csv(",admin\n").unwrap_err();
        assert!(matches!(err.kind, DsErrKind::CsvInvalid { line: 1, .. }));
    }

    #[test]
    fn quoted_members_may_contain_commas() {
        let rows = parse_membership_csv("member,tier\n\"Smith, Jo\",ADMIN\n").unwrap();
        assert_eq!(
            rows,
            [MembershipRow { line: 2, member: "Smith, Jo".to_string(), tier: PrivilegeTier::Admin }]
        );
    }

    #[test]
    fn header_only_counts_on_the_first_row() {
        let err = parse_membership_csv("alex,viewer\nmember,tier\n").unwrap_err();
        assert!(matches!(err.kind, DsErrKind::CsvInvalid { line: 2, .. }));
    }
}
