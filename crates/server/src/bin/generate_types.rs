//! Writes the TypeScript declarations of the API types to `shared/types.ts`
//! (or the path given as the first argument).

use std::{env, fs, path::PathBuf};

use ts_rs::TS;

fn main() -> anyhow::Result<()> {
    let decls = [
        db::models::user::User::decl(),
        db::models::artist::Artist::decl(),
        db::models::artist::ArtistWithRole::decl(),
        db::models::artist::CreateArtist::decl(),
        db::models::artist::UpdateArtist::decl(),
        db::models::artist_collaborator::CollaboratorRole::decl(),
        db::models::artist_collaborator::ArtistCollaborator::decl(),
        db::models::artist_collaborator::CollaboratorWithUser::decl(),
        db::models::artist_invite::InviteStatus::decl(),
        db::models::artist_invite::ArtistInvite::decl(),
        db::models::artist_invite::CreateArtistInvite::decl(),
        db::models::event::EventTag::decl(),
        db::models::event::Event::decl(),
        db::models::event::CreateEvent::decl(),
        db::models::event::UpdateEvent::decl(),
        db::models::event_expense::EventExpense::decl(),
        db::models::event_expense::CreateEventExpense::decl(),
        db::models::notification::NotificationKind::decl(),
        db::models::notification::Notification::decl(),
        services::services::calendar::WeekStart::decl(),
        services::services::calendar::CalendarDay::decl(),
        services::services::calendar::MonthGrid::decl(),
        services::services::events::FinancialSummary::decl(),
        services::services::leave_artist::LeaveAction::decl(),
        services::services::leave_artist::LeaveAssessment::decl(),
        services::services::leave_artist::LeaveOutcome::decl(),
        services::services::leave_artist::TransferOwnershipRequest::decl(),
        services::services::leave_artist::TransferOutcome::decl(),
        services::services::leave_artist::CascadeReport::decl(),
        services::services::realtime::ChangeTable::decl(),
        services::services::realtime::ChangeKind::decl(),
        services::services::realtime::ChangeEvent::decl(),
        server::routes::users::RegisterUser::decl(),
        server::routes::artists::SetActiveArtist::decl(),
        server::routes::collaborators::ChangeRole::decl(),
        server::routes::events::SetConfirmed::decl(),
        server::routes::notifications::UnreadCount::decl(),
        server::routes::notifications::MarkedRead::decl(),
        server::routes::currency::Amount::decl(),
        server::routes::health::HealthStatus::decl(),
    ];

    let mut output = String::from("// Generated by `cargo run --bin generate-types`. Do not edit.\n\n");
    for decl in decls {
        output.push_str("export ");
        output.push_str(&decl);
        output.push_str("\n\n");
    }

    let path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("shared/types.ts"));
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, output)?;
    println!("Wrote {}", path.display());
    Ok(())
}
