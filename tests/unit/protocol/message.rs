use super::*;
use crate::codec::color::HexColor;
use crate::codec::command::{BBox, Command};

#[test]
fn wire_shape_is_type_plus_content() {
    let env = Envelope::RequestCache(FontFamily {
        font_family: "Noto Sans".to_string(),
    });
    let v: serde_json::Value = serde_json::from_str(&env.to_json().unwrap()).unwrap();
    assert_eq!(
        v,
        serde_json::json!({"type": "requestCache", "content": {"fontFamily": "Noto Sans"}})
    );
    assert_eq!(env.kind(), "requestCache");
}

#[test]
fn loaded_has_no_content() {
    assert_eq!(Envelope::from_json(r#"{"type":"loaded"}"#).unwrap(), Envelope::Loaded);
    assert_eq!(Envelope::Loaded.to_json().unwrap(), r#"{"type":"loaded"}"#);
}

#[test]
fn ok_flattens_the_decoded_result() {
    let env = Envelope::RenderOk(RenderOk {
        job_id: 7,
        result: DecodedResult {
            boxes: vec![BBox::new(0.0, 0.0, 1.0, 1.0)],
            commands: vec![Command::Fill(HexColor::new(255, 0, 0))],
        },
    });
    let v: serde_json::Value = serde_json::from_str(&env.to_json().unwrap()).unwrap();
    assert_eq!(v["type"], "ok");
    assert_eq!(v["content"]["jobId"], 7);
    assert_eq!(v["content"]["boxes"][0]["x2"], 1.0);
    assert_eq!(v["content"]["commands"][0]["value"], "#ff0000");
    assert_eq!(Envelope::from_json(&env.to_json().unwrap()).unwrap(), env);
}

#[test]
fn every_known_type_name_matches_kind() {
    let samples = [
        Envelope::RenderErr(RenderErr {
            job_id: 1,
            message: "bad input".to_string(),
            text_data: "{}".to_string(),
        }),
        Envelope::Preload(FontFamily {
            font_family: "A".to_string(),
        }),
        Envelope::LoadedFont(LoadedFont {
            font_family: "A".to_string(),
            error: None,
        }),
        Envelope::FontCache(FontCache::fulfilled("A", vec![1, 2, 3])),
        Envelope::Loaded,
        Envelope::LoadErr(LoadErr {
            message: "no engine".to_string(),
        }),
    ];
    for env in samples {
        let v: serde_json::Value = serde_json::from_str(&env.to_json().unwrap()).unwrap();
        assert_eq!(v["type"], env.kind());
        assert!(KNOWN_TYPES.contains(&env.kind()));
    }
}

#[test]
fn unknown_types_are_recognized_as_ignorable() {
    let env = Envelope::from_json(r#"{"type":"telemetry","content":{"x":1}}"#).unwrap();
    assert_eq!(
        env,
        Envelope::Unrecognized {
            kind: "telemetry".to_string()
        }
    );
    assert_eq!(env.kind(), "telemetry");
    assert!(env.to_json().is_err());
}

#[test]
fn known_type_with_bad_content_is_an_error() {
    let err = Envelope::from_json(r#"{"type":"preload","content":{"family":1}}"#).unwrap_err();
    assert!(matches!(err, TextRenderError::Serde(_)));
    let err = Envelope::from_json(r#"{"content":{}}"#).unwrap_err();
    assert!(matches!(err, TextRenderError::Serde(_)));
}

#[test]
fn font_cache_result_prefers_error() {
    assert_eq!(FontCache::fulfilled("A", vec![9]).into_result(), Ok(vec![9]));
    assert_eq!(
        FontCache::failed("A", "not found").into_result(),
        Err("not found".to_string())
    );
    let empty = FontCache {
        font_family: "A".to_string(),
        cache: None,
        error: None,
    };
    assert!(empty.into_result().unwrap_err().contains("neither"));
}
