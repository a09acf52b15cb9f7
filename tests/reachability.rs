//! Exhaustive typed-reachability coverage over a populated database.
//!
//! The fixture numbers its entities 1..=20 (matching the ids the database
//! assigns on insertion order) and the case table walks every meaningful
//! origin/target combination:
//!
//! - 1: host without users          -  2: host carrying the tree
//! - 3: user without processes     -  4: user carrying the tree
//! - 5: process without participants - 6: process carrying the tree
//! - 7: empty domain                -  8: populated domain
//! - 9: participant without endpoints - 10: participant with endpoints
//! - 11: topic without endpoints    - 12: topic with endpoints
//! - 13/15: readers (locators 14 / 14+16)
//! - 17/19: writers (locators 18 / 18+20)

use statmon::{Database, Entity, EntityData, EntityId, EntityKind, Guid};

fn guid(tag: u8) -> Guid {
    let mut bytes = [0u8; 16];
    bytes[15] = tag;
    Guid::from_bytes(bytes)
}

fn id(raw: u64) -> EntityId {
    EntityId::from_raw(raw)
}

/// Populates the database and asserts the assigned ids match the numbered
/// layout.
fn populate(db: &Database) {
    let host1 = db.insert(Entity::new("host-a", EntityData::Host)).unwrap();
    let host2 = db.insert(Entity::new("host-b", EntityData::Host)).unwrap();
    let user1 = db
        .insert(Entity::new("alice", EntityData::User { host_id: host2 }))
        .unwrap();
    let user2 = db
        .insert(Entity::new("bob", EntityData::User { host_id: host2 }))
        .unwrap();
    let process1 = db
        .insert(Entity::new("idle-app", EntityData::Process { pid: 501, user_id: user2 }))
        .unwrap();
    let process2 = db
        .insert(Entity::new("dds-app", EntityData::Process { pid: 502, user_id: user2 }))
        .unwrap();
    let domain1 = db
        .insert(Entity::new("0", EntityData::Domain { domain_id: 0 }))
        .unwrap();
    let domain2 = db
        .insert(Entity::new("1", EntityData::Domain { domain_id: 1 }))
        .unwrap();
    let participant1 = db
        .insert(Entity::new(
            "participant-a",
            EntityData::Participant {
                guid: guid(1),
                process_id: Some(process2),
                domain_id: domain2,
            },
        ))
        .unwrap();
    let participant2 = db
        .insert(Entity::new(
            "participant-b",
            EntityData::Participant {
                guid: guid(2),
                process_id: Some(process2),
                domain_id: domain2,
            },
        ))
        .unwrap();
    let topic1 = db
        .insert(Entity::new(
            "quiet",
            EntityData::Topic {
                type_name: "Sample".to_string(),
                domain_id: domain2,
            },
        ))
        .unwrap();
    let topic2 = db
        .insert(Entity::new(
            "telemetry",
            EntityData::Topic {
                type_name: "Sample".to_string(),
                domain_id: domain2,
            },
        ))
        .unwrap();
    let reader1 = db
        .insert(Entity::new(
            "reader-a",
            EntityData::DataReader {
                guid: guid(3),
                participant_id: participant2,
                topic_id: topic2,
            },
        ))
        .unwrap();
    let reader_locator1 = db
        .insert(Entity::new(
            "UDPv4:[10.0.0.2]:7412",
            EntityData::Locator {
                address: "UDPv4:[10.0.0.2]:7412".to_string(),
            },
        ))
        .unwrap();
    let reader2 = db
        .insert(Entity::new(
            "reader-b",
            EntityData::DataReader {
                guid: guid(4),
                participant_id: participant2,
                topic_id: topic2,
            },
        ))
        .unwrap();
    let reader_locator2 = db
        .insert(Entity::new(
            "UDPv4:[10.0.0.2]:7413",
            EntityData::Locator {
                address: "UDPv4:[10.0.0.2]:7413".to_string(),
            },
        ))
        .unwrap();
    let writer1 = db
        .insert(Entity::new(
            "writer-a",
            EntityData::DataWriter {
                guid: guid(5),
                participant_id: participant2,
                topic_id: topic2,
            },
        ))
        .unwrap();
    let writer_locator1 = db
        .insert(Entity::new(
            "UDPv4:[10.0.0.3]:7412",
            EntityData::Locator {
                address: "UDPv4:[10.0.0.3]:7412".to_string(),
            },
        ))
        .unwrap();
    let writer2 = db
        .insert(Entity::new(
            "writer-b",
            EntityData::DataWriter {
                guid: guid(6),
                participant_id: participant2,
                topic_id: topic2,
            },
        ))
        .unwrap();
    let writer_locator2 = db
        .insert(Entity::new(
            "UDPv4:[10.0.0.3]:7413",
            EntityData::Locator {
                address: "UDPv4:[10.0.0.3]:7413".to_string(),
            },
        ))
        .unwrap();

    let assigned = [
        host1, host2, user1, user2, process1, process2, domain1, domain2, participant1,
        participant2, topic1, topic2, reader1, reader_locator1, reader2, reader_locator2, writer1,
        writer_locator1, writer2, writer_locator2,
    ];
    for (index, entity_id) in assigned.iter().enumerate() {
        assert_eq!(entity_id.value(), index as u64 + 1);
    }

    db.link(host2, user1).unwrap();
    db.link(host2, user2).unwrap();
    db.link(user2, process1).unwrap();
    db.link(user2, process2).unwrap();
    db.link(process2, participant1).unwrap();
    db.link(process2, participant2).unwrap();
    db.link(domain2, participant1).unwrap();
    db.link(domain2, participant2).unwrap();
    db.link(domain2, topic1).unwrap();
    db.link(domain2, topic2).unwrap();
    db.link(participant2, reader1).unwrap();
    db.link(participant2, reader2).unwrap();
    db.link(participant2, writer1).unwrap();
    db.link(participant2, writer2).unwrap();
    db.link(topic2, reader1).unwrap();
    db.link(topic2, reader2).unwrap();
    db.link(topic2, writer1).unwrap();
    db.link(topic2, writer2).unwrap();
    db.link(reader1, reader_locator1).unwrap();
    db.link(reader2, reader_locator1).unwrap();
    db.link(reader2, reader_locator2).unwrap();
    db.link(writer1, writer_locator1).unwrap();
    db.link(writer2, writer_locator1).unwrap();
    db.link(writer2, writer_locator2).unwrap();
}

/// `(target kind, origin number, expected entity numbers)`; origin 0 asks
/// for every entity of the kind regardless of origin.
type Case = (EntityKind, u64, &'static [u64]);

const CASES: &[Case] = &[
    // Everything of a kind.
    (EntityKind::Host, 0, &[1, 2]),
    (EntityKind::User, 0, &[3, 4]),
    (EntityKind::Process, 0, &[5, 6]),
    (EntityKind::Domain, 0, &[7, 8]),
    (EntityKind::Participant, 0, &[9, 10]),
    (EntityKind::Topic, 0, &[11, 12]),
    (EntityKind::DataReader, 0, &[13, 15]),
    (EntityKind::DataWriter, 0, &[17, 19]),
    (EntityKind::Locator, 0, &[14, 16, 18, 20]),
    // From hosts.
    (EntityKind::Host, 2, &[2]),
    (EntityKind::Host, 1, &[1]),
    (EntityKind::User, 2, &[3, 4]),
    (EntityKind::User, 1, &[]),
    (EntityKind::Process, 2, &[5, 6]),
    (EntityKind::Process, 1, &[]),
    (EntityKind::Domain, 2, &[8]),
    (EntityKind::Domain, 1, &[]),
    (EntityKind::Participant, 2, &[9, 10]),
    (EntityKind::Participant, 1, &[]),
    (EntityKind::Topic, 2, &[12]),
    (EntityKind::Topic, 1, &[]),
    (EntityKind::DataWriter, 2, &[17, 19]),
    (EntityKind::DataWriter, 1, &[]),
    (EntityKind::DataReader, 2, &[13, 15]),
    (EntityKind::DataReader, 1, &[]),
    (EntityKind::Locator, 2, &[14, 16, 18, 20]),
    (EntityKind::Locator, 1, &[]),
    // From users.
    (EntityKind::Host, 4, &[2]),
    (EntityKind::Host, 3, &[2]),
    (EntityKind::User, 4, &[4]),
    (EntityKind::User, 3, &[3]),
    (EntityKind::Process, 4, &[5, 6]),
    (EntityKind::Process, 3, &[]),
    (EntityKind::Domain, 4, &[8]),
    (EntityKind::Domain, 3, &[]),
    (EntityKind::Participant, 4, &[9, 10]),
    (EntityKind::Participant, 3, &[]),
    (EntityKind::Topic, 4, &[12]),
    (EntityKind::Topic, 3, &[]),
    (EntityKind::DataWriter, 4, &[17, 19]),
    (EntityKind::DataWriter, 3, &[]),
    (EntityKind::DataReader, 4, &[13, 15]),
    (EntityKind::DataReader, 3, &[]),
    (EntityKind::Locator, 4, &[14, 16, 18, 20]),
    (EntityKind::Locator, 3, &[]),
    // From processes.
    (EntityKind::Host, 6, &[2]),
    (EntityKind::Host, 5, &[2]),
    (EntityKind::User, 6, &[4]),
    (EntityKind::User, 5, &[4]),
    (EntityKind::Process, 6, &[6]),
    (EntityKind::Process, 5, &[5]),
    (EntityKind::Domain, 6, &[8]),
    (EntityKind::Domain, 5, &[]),
    (EntityKind::Participant, 6, &[9, 10]),
    (EntityKind::Participant, 5, &[]),
    (EntityKind::Topic, 6, &[12]),
    (EntityKind::Topic, 5, &[]),
    (EntityKind::DataWriter, 6, &[17, 19]),
    (EntityKind::DataWriter, 5, &[]),
    (EntityKind::DataReader, 6, &[13, 15]),
    (EntityKind::DataReader, 5, &[]),
    (EntityKind::Locator, 6, &[14, 16, 18, 20]),
    (EntityKind::Locator, 5, &[]),
    // From domains.
    (EntityKind::Host, 8, &[2]),
    (EntityKind::Host, 7, &[]),
    (EntityKind::User, 8, &[4]),
    (EntityKind::User, 7, &[]),
    (EntityKind::Process, 8, &[6]),
    (EntityKind::Process, 7, &[]),
    (EntityKind::Domain, 8, &[8]),
    (EntityKind::Domain, 7, &[7]),
    (EntityKind::Participant, 8, &[9, 10]),
    (EntityKind::Participant, 7, &[]),
    (EntityKind::Topic, 8, &[11, 12]),
    (EntityKind::Topic, 7, &[]),
    (EntityKind::DataWriter, 8, &[17, 19]),
    (EntityKind::DataWriter, 7, &[]),
    (EntityKind::DataReader, 8, &[13, 15]),
    (EntityKind::DataReader, 7, &[]),
    (EntityKind::Locator, 8, &[14, 16, 18, 20]),
    (EntityKind::Locator, 7, &[]),
    // From participants.
    (EntityKind::Host, 10, &[2]),
    (EntityKind::Host, 9, &[2]),
    (EntityKind::User, 10, &[4]),
    (EntityKind::User, 9, &[4]),
    (EntityKind::Process, 10, &[6]),
    (EntityKind::Process, 9, &[6]),
    (EntityKind::Domain, 10, &[8]),
    (EntityKind::Domain, 9, &[8]),
    (EntityKind::Participant, 10, &[10]),
    (EntityKind::Participant, 9, &[9]),
    (EntityKind::Topic, 10, &[12]),
    (EntityKind::Topic, 9, &[]),
    (EntityKind::DataWriter, 10, &[17, 19]),
    (EntityKind::DataWriter, 9, &[]),
    (EntityKind::DataReader, 10, &[13, 15]),
    (EntityKind::DataReader, 9, &[]),
    (EntityKind::Locator, 10, &[14, 16, 18, 20]),
    (EntityKind::Locator, 9, &[]),
    // From topics.
    (EntityKind::Host, 12, &[2]),
    (EntityKind::Host, 11, &[]),
    (EntityKind::User, 12, &[4]),
    (EntityKind::User, 11, &[]),
    (EntityKind::Process, 12, &[6]),
    (EntityKind::Process, 11, &[]),
    (EntityKind::Domain, 12, &[8]),
    (EntityKind::Domain, 11, &[8]),
    (EntityKind::Participant, 12, &[10]),
    (EntityKind::Participant, 11, &[]),
    (EntityKind::Topic, 12, &[12]),
    (EntityKind::Topic, 11, &[11]),
    (EntityKind::DataWriter, 12, &[17, 19]),
    (EntityKind::DataWriter, 11, &[]),
    (EntityKind::DataReader, 12, &[13, 15]),
    (EntityKind::DataReader, 11, &[]),
    (EntityKind::Locator, 12, &[14, 16, 18, 20]),
    (EntityKind::Locator, 11, &[]),
    // From readers.
    (EntityKind::Host, 15, &[2]),
    (EntityKind::Host, 13, &[2]),
    (EntityKind::User, 15, &[4]),
    (EntityKind::User, 13, &[4]),
    (EntityKind::Process, 15, &[6]),
    (EntityKind::Process, 13, &[6]),
    (EntityKind::Domain, 15, &[8]),
    (EntityKind::Domain, 13, &[8]),
    (EntityKind::Participant, 15, &[10]),
    (EntityKind::Participant, 13, &[10]),
    (EntityKind::Topic, 15, &[12]),
    (EntityKind::Topic, 13, &[12]),
    (EntityKind::DataWriter, 15, &[17, 19]),
    (EntityKind::DataWriter, 13, &[17, 19]),
    (EntityKind::DataReader, 15, &[15]),
    (EntityKind::DataReader, 13, &[13]),
    (EntityKind::Locator, 15, &[14, 16]),
    (EntityKind::Locator, 13, &[14]),
    // From writers.
    (EntityKind::Host, 19, &[2]),
    (EntityKind::Host, 17, &[2]),
    (EntityKind::User, 19, &[4]),
    (EntityKind::User, 17, &[4]),
    (EntityKind::Process, 19, &[6]),
    (EntityKind::Process, 17, &[6]),
    (EntityKind::Domain, 19, &[8]),
    (EntityKind::Domain, 17, &[8]),
    (EntityKind::Participant, 19, &[10]),
    (EntityKind::Participant, 17, &[10]),
    (EntityKind::Topic, 19, &[12]),
    (EntityKind::Topic, 17, &[12]),
    (EntityKind::DataWriter, 19, &[19]),
    (EntityKind::DataWriter, 17, &[17]),
    (EntityKind::DataReader, 19, &[13, 15]),
    (EntityKind::DataReader, 17, &[13, 15]),
    (EntityKind::Locator, 19, &[18, 20]),
    (EntityKind::Locator, 17, &[18]),
    // From locators.
    (EntityKind::Host, 14, &[2]),
    (EntityKind::Host, 16, &[2]),
    (EntityKind::Host, 18, &[2]),
    (EntityKind::Host, 20, &[2]),
    (EntityKind::User, 14, &[4]),
    (EntityKind::User, 16, &[4]),
    (EntityKind::User, 18, &[4]),
    (EntityKind::User, 20, &[4]),
    (EntityKind::Process, 14, &[6]),
    (EntityKind::Process, 16, &[6]),
    (EntityKind::Process, 18, &[6]),
    (EntityKind::Process, 20, &[6]),
    (EntityKind::Domain, 14, &[8]),
    (EntityKind::Domain, 16, &[8]),
    (EntityKind::Domain, 18, &[8]),
    (EntityKind::Domain, 20, &[8]),
    (EntityKind::Participant, 14, &[10]),
    (EntityKind::Participant, 16, &[10]),
    (EntityKind::Participant, 18, &[10]),
    (EntityKind::Participant, 20, &[10]),
    (EntityKind::Topic, 14, &[12]),
    (EntityKind::Topic, 16, &[12]),
    (EntityKind::Topic, 18, &[12]),
    (EntityKind::Topic, 20, &[12]),
    (EntityKind::DataWriter, 14, &[]),
    (EntityKind::DataWriter, 16, &[]),
    (EntityKind::DataWriter, 18, &[17, 19]),
    (EntityKind::DataWriter, 20, &[19]),
    (EntityKind::DataReader, 14, &[13, 15]),
    (EntityKind::DataReader, 16, &[15]),
    (EntityKind::DataReader, 18, &[]),
    (EntityKind::DataReader, 20, &[]),
    (EntityKind::Locator, 14, &[14]),
    (EntityKind::Locator, 16, &[16]),
    (EntityKind::Locator, 18, &[18]),
    (EntityKind::Locator, 20, &[20]),
];

fn sorted_ids(mut ids: Vec<EntityId>) -> Vec<u64> {
    ids.sort();
    ids.into_iter().map(EntityId::value).collect()
}

#[test]
fn get_entity_ids_matches_the_case_table() {
    let db = Database::new();
    populate(&db);

    for (kind, origin, expected) in CASES {
        let result = if *origin == 0 {
            db.ids_by_kind(*kind).unwrap()
        } else {
            db.get_entity_ids(*kind, id(*origin)).unwrap()
        };
        assert_eq!(
            sorted_ids(result),
            expected.to_vec(),
            "get_entity_ids({kind}, {origin})"
        );
    }
}

#[test]
fn get_entities_returns_the_same_sets_as_snapshots() {
    let db = Database::new();
    populate(&db);

    for (kind, origin, expected) in CASES {
        let result = if *origin == 0 {
            db.by_kind(*kind).unwrap()
        } else {
            db.get_entities(*kind, id(*origin)).unwrap()
        };
        for entity in &result {
            assert_eq!(entity.kind(), *kind);
        }
        assert_eq!(
            sorted_ids(result.into_iter().map(|e| e.id).collect()),
            expected.to_vec(),
            "get_entities({kind}, {origin})"
        );
    }
}

#[test]
fn queries_reject_unknown_origins_and_invalid_kinds() {
    let db = Database::new();
    populate(&db);

    for kind in EntityKind::ALL {
        assert!(db.get_entities(kind, id(999)).is_err());
        assert!(db.get_entity_ids(kind, id(999)).is_err());
    }
    for origin in 1..=20 {
        assert!(db.get_entities(EntityKind::Invalid, id(origin)).is_err());
        assert!(db.get_entity_ids(EntityKind::Invalid, id(origin)).is_err());
    }
}

#[test]
fn reachability_is_symmetric_over_the_whole_layout() {
    let db = Database::new();
    populate(&db);

    for a in 1..=20u64 {
        let a_kind = db.get_existing(id(a)).unwrap().kind();
        for b in 1..=20u64 {
            let b_kind = db.get_existing(id(b)).unwrap().kind();
            let forward = db.get_entity_ids(b_kind, id(a)).unwrap().contains(&id(b));
            let backward = db.get_entity_ids(a_kind, id(b)).unwrap().contains(&id(a));
            assert_eq!(forward, backward, "asymmetry between {a} and {b}");
        }
    }
}
