use crate::{EveProfile, Scopes, UserProfile};

use pretty_assertions::assert_eq;
use serde_json::{json, Value};

const TEST_PILOT_JSON: &str = "{\
    \"CharacterID\":12345678,\
    \"CharacterName\":\"Test Pilot\",\
    \"ExpiresOn\":\"2024-01-01T00:00:00\",\
    \"Scopes\":\"publicData\",\
    \"TokenType\":\"Character\",\
    \"CharacterOwnerHash\":\"abc123\"\
}";

#[test]
fn test_normalize_character() {
    let profile: EveProfile = TEST_PILOT_JSON.parse().unwrap();

    assert_eq!("eve", profile.provider());
    assert_eq!("12345678", profile.id().unwrap().as_str());
    assert_eq!("Test Pilot", profile.name().unwrap().as_str());
    assert_eq!("2024-01-01T00:00:00", profile.expires().unwrap().as_str());
    assert_eq!(
        Some(&Scopes::Delimited("publicData".to_string())),
        profile.scopes()
    );
    assert_eq!("Character", profile.token_type().unwrap().as_str());
    assert_eq!("abc123", profile.character_owner_hash().unwrap().as_str());

    assert_eq!(
        json!({
            "provider": "eve",
            "id": "12345678",
            "name": "Test Pilot",
            "expires": "2024-01-01T00:00:00",
            "scopes": "publicData",
            "tokenType": "Character",
            "characterOwnerHash": "abc123",
        }),
        serde_json::to_value(&profile).unwrap()
    );
}

#[test]
fn test_normalize_string_and_value_agree() {
    let inputs = vec![
        serde_json::from_str::<Value>(TEST_PILOT_JSON).unwrap(),
        json!({"CharacterID": "95465499", "CharacterName": "CCP Bartender"}),
        json!({"CharacterID": 9.5e7, "Scopes": ["publicData", "esi-skills.read_skills.v1"]}),
        json!({"CharacterID": null, "Unrelated": {"nested": true}}),
        json!({}),
        json!([1, 2, 3]),
        json!("just a string"),
        json!(null),
    ];

    for input in inputs {
        assert_eq!(
            EveProfile::from_value(&input),
            input.to_string().parse::<EveProfile>().unwrap(),
            "input: {input}"
        );
    }
}

#[test]
fn test_id_is_stringified_character_id() {
    for (character_id, expected) in [
        (json!(12345678), "12345678"),
        (json!("2112625428"), "2112625428"),
        (json!(-7), "-7"),
        (json!(1.5), "1.5"),
        (json!(12345678.0), "12345678"),
        (json!(9.5e7), "95000000"),
        (json!(true), "true"),
    ] {
        let profile = EveProfile::from_value(&json!({ "CharacterID": character_id }));
        assert_eq!(expected, profile.id().unwrap().as_str());
        assert_eq!("eve", profile.provider());
    }
}

#[test]
fn test_missing_fields_are_absent() {
    let profile = EveProfile::from_value(&json!({
        "CharacterID": 90000001,
        "CharacterName": null,
    }));

    assert_eq!("90000001", profile.id().unwrap().as_str());
    assert_eq!(None, profile.name());
    assert_eq!(None, profile.expires());
    assert_eq!(None, profile.expires_at());
    assert_eq!(None, profile.scopes());
    assert_eq!(None, profile.token_type());
    assert_eq!(None, profile.character_owner_hash());
    assert_eq!(
        json!({"provider": "eve", "id": "90000001"}),
        serde_json::to_value(&profile).unwrap()
    );
}

#[test]
fn test_non_object_input() {
    for input in [json!([1, 2]), json!(42), json!("CharacterID"), json!(null)] {
        assert_eq!(EveProfile::default(), EveProfile::from_value(&input));
    }
    assert_eq!("eve", EveProfile::default().provider());
}

#[test]
fn test_scopes_pass_through() {
    let profile = EveProfile::from_value(&json!({
        "Scopes": ["esi-wallet.read_character_wallet.v1", "publicData", null],
    }));
    assert_eq!(
        Some(&Scopes::List(vec![
            "esi-wallet.read_character_wallet.v1".to_string(),
            "publicData".to_string(),
            "null".to_string(),
        ])),
        profile.scopes()
    );

    let profile = EveProfile::from_value(&json!({
        "Scopes": "publicData esi-skills.read_skills.v1",
    }));
    assert!(profile.scopes().unwrap().contains("esi-skills.read_skills.v1"));
}

#[test]
fn test_malformed_string() {
    let err = "{\"CharacterID\": 1".parse::<EveProfile>().unwrap_err();
    assert_eq!("Failed to parse character profile JSON", err.to_string());
    assert!(err.0.is_eof());

    assert!("not json".parse::<EveProfile>().is_err());
}

#[test]
fn test_profile_deserialize_round_trip() {
    let profile: EveProfile = TEST_PILOT_JSON.parse().unwrap();
    let serialized = serde_json::to_string(&profile).unwrap();
    assert_eq!(profile, serde_json::from_str::<EveProfile>(&serialized).unwrap());

    assert!(serde_json::from_str::<EveProfile>("{\"provider\":\"github\"}").is_err());
}

#[test]
fn test_user_profile_keeps_raw_response() {
    let json: Value = serde_json::from_str(TEST_PILOT_JSON).unwrap();
    let user_profile = UserProfile::new(TEST_PILOT_JSON.to_string(), json.clone());

    assert_eq!(TEST_PILOT_JSON, user_profile.raw());
    assert_eq!(&json, user_profile.json());
    assert_eq!("Test Pilot", user_profile.name().unwrap().as_str());
    assert_eq!(
        &TEST_PILOT_JSON.parse::<EveProfile>().unwrap(),
        user_profile.profile()
    );

    let (profile, raw, parsed) = user_profile.into_parts();
    assert_eq!("eve", profile.provider());
    assert_eq!(TEST_PILOT_JSON, raw);
    assert_eq!(json, parsed);
}
