use super::{create_flaky_service, create_test_service, start_time};
use crate::core::constants::{INVITE_ALPHABET, INVITE_MAX_GENERATION_ATTEMPTS, JOIN_REJECTED, MEMBER_JOINED};
use crate::core::errors::DenError;
use crate::core::invites::{SequenceCodeGenerator, format_code, is_well_formed, normalize_code};
use crate::core::models::Role;
use crate::core::services::JoinOutcome;
use crate::infrastructure::logging::LoggingService;
use chrono::Duration;
use std::sync::Arc;

#[test]
fn test_normalize_and_format_code() {
    assert_eq!(normalize_code(" abcd-efgh "), "ABCDEFGH");
    assert_eq!(format_code("abcdefgh"), "ABCD-EFGH");
    assert!(is_well_formed("ABCD2345", 8));
    assert!(!is_well_formed("ABCD0O1I", 8));
    assert!(!is_well_formed("ABC", 8));
}

#[tokio::test]
async fn test_create_invite_generates_code_from_alphabet() {
    let (service, _clock, _logging) = create_test_service();
    let den = service.create_den("Home".to_string(), None, "parent-1").await.unwrap();

    let invite = service.create_invite(&den.id, "parent-1", Role::Caregiver).await.unwrap();
    assert_eq!(invite.code.len(), 8);
    assert!(invite.code.bytes().all(|b| INVITE_ALPHABET.contains(&b)));
    assert_eq!(invite.expires_at - invite.created_at, Duration::days(3));
    assert_eq!(invite.created_at, start_time());
    assert!(invite.used_at.is_none());
}

#[tokio::test]
async fn test_create_invite_requires_parent() {
    let (service, _clock, _logging) = create_test_service();
    let den = service.create_den("Home".to_string(), None, "parent-1").await.unwrap();
    let invite = service.create_invite(&den.id, "parent-1", Role::Viewer).await.unwrap();
    service.join_den(&invite.code, "viewer-1").await.unwrap();

    let result = service.create_invite(&den.id, "viewer-1", Role::Parent).await;
    assert!(matches!(result, Err(DenError::NotDenParent(_))));

    let result = service.create_invite(&den.id, "stranger", Role::Parent).await;
    assert!(matches!(result, Err(DenError::NotDenMember(_))));
}

#[tokio::test]
async fn test_code_collision_regenerates() {
    let (service, _clock, _logging) = create_test_service();
    let service = service.with_code_generator(Arc::new(SequenceCodeGenerator::new([
        "AAAA2222", "AAAA2222", "BBBB3333",
    ])));
    let den = service.create_den("Home".to_string(), None, "parent-1").await.unwrap();

    let first = service.create_invite(&den.id, "parent-1", Role::Parent).await.unwrap();
    let second = service.create_invite(&den.id, "parent-1", Role::Parent).await.unwrap();
    assert_eq!(first.code, "AAAA2222");
    assert_eq!(second.code, "BBBB3333");
}

#[tokio::test]
async fn test_code_generation_gives_up_after_bounded_retries() {
    let (service, _clock, _logging) = create_test_service();
    let service = service.with_code_generator(Arc::new(SequenceCodeGenerator::new(["SAME2222"])));
    let den = service.create_den("Home".to_string(), None, "parent-1").await.unwrap();

    service.create_invite(&den.id, "parent-1", Role::Parent).await.unwrap();
    let result = service.create_invite(&den.id, "parent-1", Role::Parent).await;
    assert!(matches!(result, Err(DenError::InviteCodeExhausted(n)) if n == INVITE_MAX_GENERATION_ATTEMPTS));
}

#[tokio::test]
async fn test_validate_code_is_case_and_dash_insensitive() {
    let (service, _clock, _logging) = create_test_service();
    let service = service.with_code_generator(Arc::new(SequenceCodeGenerator::new(["ABCDEFGH"])));
    let den = service.create_den("Home".to_string(), None, "parent-1").await.unwrap();
    service.create_invite(&den.id, "parent-1", Role::Caregiver).await.unwrap();

    let found = service.validate_code("abcd-efgh").await.unwrap();
    assert_eq!(found.den_id, den.id);
    assert_eq!(found.role, Role::Caregiver);
    assert!(service.validate_code("ZZZZ-ZZZZ").await.is_none());
    assert!(service.validate_code("   ").await.is_none());
}

#[tokio::test]
async fn test_invite_expires_after_three_days() {
    let (service, clock, _logging) = create_test_service();
    let den = service.create_den("Home".to_string(), None, "parent-1").await.unwrap();
    let invite = service.create_invite(&den.id, "parent-1", Role::Parent).await.unwrap();

    clock.advance(Duration::days(3) - Duration::seconds(1));
    assert!(service.validate_code(&invite.code).await.is_some());

    clock.advance(Duration::seconds(1));
    assert!(service.validate_code(&invite.code).await.is_none());

    let result = service.join_den(&invite.code, "late-user").await;
    assert!(matches!(result, Err(DenError::InvalidInviteCode)));
}

#[tokio::test]
async fn test_join_den_adds_member_and_consumes_invite() {
    let (service, _clock, logging) = create_test_service();
    let den = service.create_den("Home".to_string(), None, "parent-1").await.unwrap();
    let invite = service.create_invite(&den.id, "parent-1", Role::Parent).await.unwrap();

    let outcome = service.join_den(&format_code(&invite.code).to_lowercase(), "parent-2").await.unwrap();
    match outcome {
        JoinOutcome::Joined(member) => {
            assert_eq!(member.user_id, "parent-2");
            assert_eq!(member.role, Role::Parent);
            assert_eq!(member.den_id, den.id);
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    let members = service.list_members(&den.id, "parent-2").await.unwrap();
    assert_eq!(members.len(), 2);

    // a used invite never validates again, even before it expires
    assert!(service.validate_code(&invite.code).await.is_none());
    let result = service.join_den(&invite.code, "someone-else").await;
    assert!(matches!(result, Err(DenError::InvalidInviteCode)));

    let logs = logging.get_den_logs(&den.id).await.unwrap();
    assert!(logs.iter().any(|l| l.action == MEMBER_JOINED));
}

#[tokio::test]
async fn test_join_as_existing_member_leaves_invite_unused() {
    let (service, _clock, _logging) = create_test_service();
    let den = service.create_den("Home".to_string(), None, "parent-1").await.unwrap();
    let invite = service.create_invite(&den.id, "parent-1", Role::Viewer).await.unwrap();

    let outcome = service.join_den(&invite.code, "parent-1").await.unwrap();
    match outcome {
        JoinOutcome::AlreadyMember(member) => assert_eq!(member.role, Role::Parent),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(service.validate_code(&invite.code).await.is_some());
}

#[tokio::test]
async fn test_rate_limit_blocks_valid_code_after_failures() {
    let (service, _clock, logging) = create_test_service();
    let den = service.create_den("Home".to_string(), None, "parent-1").await.unwrap();
    let invite = service.create_invite(&den.id, "parent-1", Role::Caregiver).await.unwrap();

    for _ in 0..5 {
        let result = service.join_den("WRONG222", "guesser").await;
        assert!(matches!(result, Err(DenError::InvalidInviteCode)));
    }
    assert_eq!(service.failed_attempts_count("guesser", 15).await, 5);

    let result = service.join_den(&invite.code, "guesser").await;
    assert!(matches!(result, Err(DenError::RateLimited(15))));
    assert!(service.validate_code(&invite.code).await.is_some());
    assert!(matches!(
        service.list_members(&den.id, "guesser").await,
        Err(DenError::NotDenMember(_))
    ));

    let logs = logging.get_logs().await.unwrap();
    assert!(logs.iter().any(|l| l.action == JOIN_REJECTED));

    // other users are not affected
    assert!(matches!(
        service.join_den(&invite.code, "honest").await,
        Ok(JoinOutcome::Joined(_))
    ));
}

#[tokio::test]
async fn test_rate_limit_window_slides() {
    let (service, clock, _logging) = create_test_service();
    let den = service.create_den("Home".to_string(), None, "parent-1").await.unwrap();
    let invite = service.create_invite(&den.id, "parent-1", Role::Caregiver).await.unwrap();

    for _ in 0..5 {
        let _ = service.join_den("WRONG222", "guesser").await;
    }
    clock.advance(Duration::minutes(16));
    assert_eq!(service.failed_attempts_count("guesser", 15).await, 0);

    let outcome = service.join_den(&invite.code, "guesser").await.unwrap();
    assert!(matches!(outcome, JoinOutcome::Joined(_)));
}

#[tokio::test]
async fn test_successful_attempts_do_not_count_as_failures() {
    let (service, _clock, _logging) = create_test_service();
    let den = service.create_den("Home".to_string(), None, "parent-1").await.unwrap();
    let invite = service.create_invite(&den.id, "parent-1", Role::Viewer).await.unwrap();

    for _ in 0..4 {
        let _ = service.join_den("WRONG222", "user").await;
    }
    service.join_den(&invite.code, "user").await.unwrap();
    assert_eq!(service.failed_attempts_count("user", 15).await, 4);
}

#[tokio::test]
async fn test_revoked_invite_no_longer_validates() {
    let (service, _clock, _logging) = create_test_service();
    let den = service.create_den("Home".to_string(), None, "parent-1").await.unwrap();
    let invite = service.create_invite(&den.id, "parent-1", Role::Viewer).await.unwrap();
    assert_eq!(service.list_active_invites(&den.id, "parent-1").await.unwrap().len(), 1);

    service.revoke_invite(&invite.id, "parent-1").await.unwrap();
    assert!(service.validate_code(&invite.code).await.is_none());
    assert!(service.list_active_invites(&den.id, "parent-1").await.unwrap().is_empty());

    let result = service.revoke_invite("missing", "parent-1").await;
    assert!(matches!(result, Err(DenError::InviteNotFound(_))));
}

#[tokio::test]
async fn test_lookups_fail_open_when_storage_is_down() {
    let (service, storage, _clock) = create_flaky_service();
    let den = service.create_den("Home".to_string(), None, "parent-1").await.unwrap();
    let invite = service.create_invite(&den.id, "parent-1", Role::Viewer).await.unwrap();
    for _ in 0..5 {
        let _ = service.join_den("WRONG222", "guesser").await;
    }

    storage.set_failing(true);
    assert!(service.validate_code(&invite.code).await.is_none());
    assert_eq!(service.failed_attempts_count("guesser", 15).await, 0);
    let result = service.join_den(&invite.code, "guesser").await;
    assert!(matches!(result, Err(DenError::InvalidInviteCode)));

    storage.set_failing(false);
    assert!(service.validate_code(&invite.code).await.is_some());
    assert!(matches!(
        service.join_den(&invite.code, "guesser").await,
        Err(DenError::RateLimited(_))
    ));
}

#[tokio::test]
async fn test_rate_limited_join_never_looks_up_the_code() {
    let (service, storage, _clock) = create_flaky_service();
    let den = service.create_den("Home".to_string(), None, "parent-1").await.unwrap();
    let invite = service.create_invite(&den.id, "parent-1", Role::Caregiver).await.unwrap();

    for _ in 0..5 {
        let result = service.join_den("ZZZZ2222", "guesser").await;
        assert!(matches!(result, Err(DenError::InvalidInviteCode)));
    }
    let lookups_before = storage.invite_lookups();
    assert_eq!(lookups_before, 5);

    let result = service.join_den(&invite.code, "guesser").await;
    assert!(matches!(result, Err(DenError::RateLimited(_))));
    assert_eq!(storage.invite_lookups(), lookups_before);
    assert_eq!(service.failed_attempts_count("guesser", 15).await, 5);
}
