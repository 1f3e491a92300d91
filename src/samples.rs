// samples.rs
//
// リモートのコレクションが空 (または未取得) のときに丸ごと差し替える
// 組み込みのサンプルコレクション。キャッシュではなく表示用の既定値。
use crate::models::{Essay, Photo};

/// ギャラリー用のサンプル写真
pub fn sample_photos() -> Vec<Photo> {
    vec![
        Photo {
            id: 1,
            url: "/samples/aokigahara-morning.jpg".to_string(),
            title: "Morning Fog".to_string(),
            location: Some("Aokigahara, Yamanashi".to_string()),
            description: Some("Fog drifting between the trees just after sunrise.".to_string()),
            taken_at: "2023-11-04T06:42:00+09:00".to_string(),
            camera: Some("Nikon Z7".to_string()),
            lens: Some("NIKKOR Z 24-70mm f/2.8 S".to_string()),
            settings: Some("f/5.6 · 1/125s · ISO 400".to_string()),
        },
        Photo {
            id: 2,
            url: "/samples/shibuya-crossing.jpg".to_string(),
            title: "Crossing".to_string(),
            location: Some("Shibuya, Tokyo".to_string()),
            description: None,
            taken_at: "2024-02-17T19:03:00+09:00".to_string(),
            camera: Some("Ricoh GR III".to_string()),
            lens: None,
            settings: Some("f/2.8 · 1/60s · ISO 1600".to_string()),
        },
        Photo {
            id: 3,
            url: "/samples/seto-inland-sea.jpg".to_string(),
            title: "Inland Sea".to_string(),
            location: Some("Naoshima, Kagawa".to_string()),
            description: Some("Ferry wake at dusk.".to_string()),
            taken_at: "2024-05-02T18:21:00+09:00".to_string(),
            camera: Some("Nikon Z7".to_string()),
            lens: Some("NIKKOR Z 70-200mm f/2.8 VR S".to_string()),
            settings: Some("f/8 · 1/500s · ISO 200".to_string()),
        },
        Photo {
            id: 4,
            url: "/samples/yatsugatake-ridge.jpg".to_string(),
            title: "Ridge Line".to_string(),
            location: Some("Yatsugatake".to_string()),
            description: None,
            taken_at: "2024-08-11T05:10:00+09:00".to_string(),
            camera: Some("Nikon Z7".to_string()),
            lens: Some("NIKKOR Z 14-30mm f/4 S".to_string()),
            settings: Some("f/11 · 1/60s · ISO 100".to_string()),
        },
    ]
}

/// マガジンセクション用のサンプルエッセイ
pub fn sample_essays() -> Vec<Essay> {
    vec![
        Essay {
            id: 1,
            title: "On Waiting for Light".to_string(),
            category: Some("Photography".to_string()),
            cover_url: Some("/samples/aokigahara-morning.jpg".to_string()),
            body: "Most of landscape photography is waiting. The composition is settled \
                   in the first ten minutes; the next two hours belong to the weather. \
                   I have learned to treat the waiting as part of the exposure, a long \
                   integration over patience rather than time."
                .to_string(),
            published_at: "2024-03-09T10:00:00+09:00".to_string(),
        },
        Essay {
            id: 2,
            title: "Reading on Ferries".to_string(),
            category: Some("Notes".to_string()),
            cover_url: None,
            body: "A ferry is the last public place where nobody expects you to be \
                   reachable. Forty minutes between islands is exactly one chapter, \
                   and the diesel hum underneath is better than any reading playlist."
                .to_string(),
            published_at: "2024-06-20T10:00:00+09:00".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn sample_ids_are_unique_within_each_collection() {
        let photo_ids: HashSet<i64> = sample_photos().iter().map(|p| p.id).collect();
        assert_eq!(photo_ids.len(), sample_photos().len());

        let essay_ids: HashSet<i64> = sample_essays().iter().map(|e| e.id).collect();
        assert_eq!(essay_ids.len(), sample_essays().len());
    }

    #[test]
    fn sample_essays_have_readable_bodies() {
        for essay in sample_essays() {
            assert!(!essay.body.trim().is_empty());
            assert!(essay.read_time().ends_with("min read"));
        }
    }
}
