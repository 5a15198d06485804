//! Crash-recovery behavior: an engine reopened on the same WAL must see
//! exactly the state the previous instance had durably applied.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};

use prenota::engine::{BookingPolicy, CreateReservation, Engine, NewEnrollee};
use prenota::model::{Identity, Reply, Role, Rsvp};

fn test_wal_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("prenota_test_persistence");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    let _ = std::fs::remove_file(&path);
    path
}

fn at(h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2120, 6, 3)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

async fn register(engine: &Engine, email: &str, role: Role) -> Identity {
    engine
        .register_enrollee(NewEnrollee {
            email: email.into(),
            name: "Nome".into(),
            surname: "Cognome".into(),
            birth_date: NaiveDate::from_ymd_opt(1995, 4, 12).unwrap(),
            role,
        })
        .await
        .unwrap();
    Identity::from(&engine.get_enrollee(email).await.unwrap())
}

/// Book a room, gather answers, drop the engine, reopen on the same file.
#[tokio::test]
async fn reopened_engine_replays_the_full_state() {
    let path = test_wal_path("reopen.wal");

    let id = {
        let engine = Engine::open(path.clone(), BookingPolicy::default()).unwrap();
        let coord = register(&engine, "resp@club.it", Role::Coordinator).await;
        register(&engine, "b@club.it", Role::Student).await;
        register(&engine, "c@club.it", Role::Teacher).await;
        let room = engine.add_room("Sala Verdi", "musica", 3).await.unwrap();

        let id = engine
            .create_reservation(
                &coord,
                CreateReservation {
                    room_id: room,
                    start: at(10),
                    duration_hours: 2,
                    activity: "prova d'orchestra".into(),
                    invitees: vec!["b@club.it".into(), "c@club.it".into()],
                },
            )
            .await
            .unwrap();
        engine
            .respond_invitation("b@club.it", id, Reply::Accepted, None)
            .await
            .unwrap();
        engine
            .respond_invitation("c@club.it", id, Reply::Declined, Some("lezione".into()))
            .await
            .unwrap();
        id
    };

    let engine = Engine::open(path, BookingPolicy::default()).unwrap();

    let info = engine.get_reservation(id).await.unwrap();
    assert_eq!(info.activity, "prova d'orchestra");
    assert_eq!(info.room_name, "Sala Verdi");
    assert_eq!(info.accepted_count, 1);

    let invitations = engine.invitees_of(id).await.unwrap();
    assert_eq!(invitations.len(), 2);
    assert_eq!(invitations[0].response, Rsvp::Accepted);
    assert_eq!(invitations[1].response, Rsvp::Declined);
    assert_eq!(invitations[1].reason.as_deref(), Some("lezione"));

    assert_eq!(engine.list_enrollees(None).await.len(), 3);

    // Id allocation resumes past the replayed reservations.
    let coord = Identity::from(&engine.get_enrollee("resp@club.it").await.unwrap());
    let next = engine
        .create_reservation(
            &coord,
            CreateReservation {
                room_id: info.room_id,
                start: at(14),
                duration_hours: 1,
                activity: "prova serale".into(),
                invitees: vec![],
            },
        )
        .await
        .unwrap();
    assert_eq!(next, id + 1);
}

#[tokio::test]
async fn deletions_survive_a_reopen() {
    let path = test_wal_path("reopen_delete.wal");

    {
        let engine = Engine::open(path.clone(), BookingPolicy::default()).unwrap();
        let coord = register(&engine, "resp@club.it", Role::Coordinator).await;
        register(&engine, "b@club.it", Role::Student).await;
        let room = engine.add_room("Sala Verdi", "musica", 3).await.unwrap();

        let keep = engine
            .create_reservation(
                &coord,
                CreateReservation {
                    room_id: room,
                    start: at(10),
                    duration_hours: 1,
                    activity: "tenuta".into(),
                    invitees: vec![],
                },
            )
            .await
            .unwrap();
        let gone = engine
            .create_reservation(
                &coord,
                CreateReservation {
                    room_id: room,
                    start: at(12),
                    duration_hours: 1,
                    activity: "cancellata".into(),
                    invitees: vec!["b@club.it".into()],
                },
            )
            .await
            .unwrap();
        engine.delete_reservation(&coord, gone).await.unwrap();

        assert!(engine.get_reservation(keep).await.is_ok());
        assert!(engine.get_reservation(gone).await.is_err());
    }

    let engine = Engine::open(path, BookingPolicy::default()).unwrap();
    let listed = engine
        .list_reservations(NaiveDate::from_ymd_opt(2120, 6, 3).unwrap(), None)
        .await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].activity, "tenuta");
    assert!(engine.list_invitations_for("b@club.it").await.is_empty());
}

#[tokio::test]
async fn compaction_preserves_state_across_a_reopen() {
    let path = test_wal_path("compact_reopen.wal");

    {
        let engine = Engine::open(path.clone(), BookingPolicy::default()).unwrap();
        let coord = register(&engine, "resp@club.it", Role::Coordinator).await;
        register(&engine, "b@club.it", Role::Student).await;
        let room = engine.add_room("Sala Verdi", "musica", 3).await.unwrap();

        // Churn: create and delete bookings so the log is mostly garbage.
        for hour in [9, 11, 13, 15] {
            let id = engine
                .create_reservation(
                    &coord,
                    CreateReservation {
                        room_id: room,
                        start: at(hour),
                        duration_hours: 1,
                        activity: "temporanea".into(),
                        invitees: vec!["b@club.it".into()],
                    },
                )
                .await
                .unwrap();
            engine.delete_reservation(&coord, id).await.unwrap();
        }
        let survivor = engine
            .create_reservation(
                &coord,
                CreateReservation {
                    room_id: room,
                    start: at(18),
                    duration_hours: 2,
                    activity: "definitiva".into(),
                    invitees: vec!["b@club.it".into()],
                },
            )
            .await
            .unwrap();
        engine
            .respond_invitation("b@club.it", survivor, Reply::Accepted, None)
            .await
            .unwrap();

        let before = std::fs::metadata(&path).unwrap().len();
        engine.compact_wal().await.unwrap();
        let after = std::fs::metadata(&path).unwrap().len();
        assert!(after < before);
        assert_eq!(engine.wal_appends_since_compact().await, 0);

        // The compacted log still accepts appends.
        engine
            .respond_invitation("b@club.it", survivor, Reply::Declined, Some("cambio".into()))
            .await
            .unwrap();
    }

    let engine = Engine::open(path, BookingPolicy::default()).unwrap();
    let listed = engine
        .list_reservations(NaiveDate::from_ymd_opt(2120, 6, 3).unwrap(), None)
        .await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].activity, "definitiva");
    assert_eq!(listed[0].accepted_count, 0);

    let invitations = engine.invitees_of(listed[0].id).await.unwrap();
    assert_eq!(invitations[0].response, Rsvp::Declined);
    assert_eq!(invitations[0].reason.as_deref(), Some("cambio"));
}
