//! The voting core: duplicate-proof vote casting, quorum evaluation, and
//! merge/reject resolution with reputation payouts.
//!
//! Everything from the duplicate check to the terminal state transition runs
//! in a single transaction per proposal, so two concurrent casts can neither
//! double-count a vote nor resolve the same proposal twice.

use sqlx::SqliteConnection;

use crate::db::{DbPool, begin_immediate, now_timestamp};
use crate::errors::AppError;
use crate::models::reputation::{self, voting_power};
use crate::models::translation::{self, NewTranslation, SOURCE_COMMUNITY, Translation};

use super::queries::{find_by_id, find_by_id_tx};
use super::types::*;

/// Points awarded to the proposal author when their edit is merged.
pub const AUTHOR_MERGE_REWARD: i64 = 10;
/// Points awarded to each voter whose vote matched the resolution outcome.
pub const ALIGNED_VOTE_REWARD: i64 = 2;

/// Cast one user's vote on a pending proposal and resolve it if quorum is
/// reached. Returns the proposal as it stands after the cast.
///
/// Tally semantics: the up/down columns accumulate reputation-weighted
/// points and decide merge vs reject; quorum is counted in distinct vote
/// rows, so a high-reputation voter still only contributes one unit of
/// participation.
pub async fn cast_vote(
    pool: &DbPool,
    proposal_id: i64,
    user_id: i64,
    value: VoteValue,
) -> Result<Proposal, AppError> {
    // Immediate mode: the cast reads before it writes, and two deferred
    // writers racing here would hit a snapshot conflict instead of queueing.
    let mut tx = begin_immediate(pool).await?;

    let proposal = find_by_id_tx(&mut *tx, proposal_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if proposal.status != ProposalStatus::Pending {
        return Err(AppError::InvalidState(
            "Voting on this proposal has closed".to_string(),
        ));
    }

    let target = translation::find_by_id_tx(&mut *tx, proposal.translation_id)
        .await?
        .ok_or(AppError::NotFound)?;

    // Weight is the caster's voting power in the target language, frozen at
    // cast time.
    let rep = reputation::get_or_create_tx(&mut *tx, user_id, &target.language).await?;
    let weight = voting_power(rep.rep_points);

    let inserted = sqlx::query(
        "INSERT INTO votes (proposal_id, user_id, value, weight, cast_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(proposal_id)
    .bind(user_id)
    .bind(value.value())
    .bind(weight)
    .bind(now_timestamp())
    .execute(&mut *tx)
    .await;
    match inserted {
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(AppError::DuplicateVote);
        }
        other => {
            other?;
        }
    }

    let column = match value {
        VoteValue::Upvote => "upvotes",
        VoteValue::Downvote => "downvotes",
    };
    let sql = format!(
        "UPDATE translation_proposals SET {column} = {column} + ?1 \
         WHERE id = ?2 AND status = 'pending'"
    );
    let bumped = sqlx::query(&sql)
        .bind(weight)
        .bind(proposal_id)
        .execute(&mut *tx)
        .await?;
    if bumped.rows_affected() != 1 {
        return Err(AppError::Conflict(
            "Proposal resolved while the vote was in flight".to_string(),
        ));
    }

    let (upvotes, downvotes): (i64, i64) = sqlx::query_as(
        "SELECT upvotes, downvotes FROM translation_proposals WHERE id = ?1",
    )
    .bind(proposal_id)
    .fetch_one(&mut *tx)
    .await?;
    let voters: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE proposal_id = ?1")
        .bind(proposal_id)
        .fetch_one(&mut *tx)
        .await?;

    if voters >= proposal.required_quorum {
        let outcome = resolve(&mut *tx, &proposal, &target, upvotes, downvotes).await?;
        log::info!(
            "Proposal {} resolved as {} ({} voters, {}/{} weighted)",
            proposal_id,
            outcome.as_str(),
            voters,
            upvotes,
            downvotes
        );
    }

    tx.commit().await?;

    find_by_id(pool, proposal_id).await?.ok_or(AppError::NotFound)
}

/// Resolve a pending proposal from its weighted tallies: a strict weighted
/// upvote majority merges, anything else (ties included) rejects.
///
/// On merge the new canonical translation is built from the proposal's
/// fields patched over the target translation, and swapped in against
/// whatever row is canonical for the pair right now. If the target was
/// itself superseded while the proposal was pending, the merge lands on top
/// of the newer canonical rather than being dropped.
async fn resolve(
    conn: &mut SqliteConnection,
    proposal: &Proposal,
    target: &Translation,
    upvotes: i64,
    downvotes: i64,
) -> Result<ProposalStatus, AppError> {
    let outcome = if upvotes > downvotes {
        ProposalStatus::Merged
    } else {
        ProposalStatus::Rejected
    };

    if outcome == ProposalStatus::Merged {
        let patch = ProposalPatch {
            new_title: proposal.new_title.clone(),
            new_lyrics: proposal.new_lyrics.clone(),
        };
        let (title, lyrics) = patch.apply(target);
        let promoted = NewTranslation {
            carol_id: target.carol_id,
            language: target.language.clone(),
            title,
            lyrics,
            source: SOURCE_COMMUNITY.to_string(),
            created_by: proposal.proposed_by,
        };

        match translation::find_canonical_tx(&mut *conn, target.carol_id, &target.language).await? {
            Some(current) => {
                translation::promote(&mut *conn, &promoted, current.id).await?;
            }
            None => {
                translation::insert_canonical(&mut *conn, &promoted).await?;
            }
        }

        reputation::adjust_tx(
            &mut *conn,
            proposal.proposed_by,
            &target.language,
            AUTHOR_MERGE_REWARD,
        )
        .await?;
    }

    // Guarded transition: zero rows means another path already resolved it.
    let updated = sqlx::query(
        "UPDATE translation_proposals SET status = ?1 WHERE id = ?2 AND status = 'pending'",
    )
    .bind(outcome.as_str())
    .bind(proposal.id)
    .execute(&mut *conn)
    .await?;
    if updated.rows_affected() != 1 {
        return Err(AppError::Conflict(
            "Proposal was already resolved".to_string(),
        ));
    }

    // Voters on the winning side earn a small reward in this language.
    let winning_value = match outcome {
        ProposalStatus::Merged => 1,
        _ => -1,
    };
    let aligned: Vec<i64> =
        sqlx::query_scalar("SELECT user_id FROM votes WHERE proposal_id = ?1 AND value = ?2")
            .bind(proposal.id)
            .bind(winning_value)
            .fetch_all(&mut *conn)
            .await?;
    for voter_id in aligned {
        reputation::adjust_tx(conn, voter_id, &target.language, ALIGNED_VOTE_REWARD).await?;
    }

    Ok(outcome)
}

/// Resolve pending proposals whose voting window has lapsed, by weighted
/// majority of whatever votes they gathered (a proposal nobody voted on is
/// rejected). Run at startup; proposals that merge here pay out exactly as
/// if the quorum vote had landed in time.
pub async fn resolve_expired(pool: &DbPool) -> Result<u64, AppError> {
    let now = now_timestamp();
    let expired: Vec<i64> = sqlx::query_scalar(
        "SELECT id FROM translation_proposals \
         WHERE status = 'pending' AND voting_ends_at < ?1 ORDER BY id ASC",
    )
    .bind(&now)
    .fetch_all(pool)
    .await?;

    let mut resolved = 0;
    for id in expired {
        let mut tx = begin_immediate(pool).await?;

        let Some(proposal) = find_by_id_tx(&mut *tx, id).await? else {
            continue;
        };
        if proposal.status != ProposalStatus::Pending {
            continue;
        }
        let Some(target) = translation::find_by_id_tx(&mut *tx, proposal.translation_id).await?
        else {
            continue;
        };

        match resolve(
            &mut *tx,
            &proposal,
            &target,
            proposal.upvotes,
            proposal.downvotes,
        )
        .await
        {
            Ok(outcome) => {
                tx.commit().await?;
                resolved += 1;
                log::info!("Expired proposal {} resolved as {}", id, outcome.as_str());
            }
            Err(e) => {
                log::error!("Failed to resolve expired proposal {id}: {e}");
            }
        }
    }

    Ok(resolved)
}
