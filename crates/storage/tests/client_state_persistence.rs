use shared::domain::{
    FeatureName, HistoryEntry, PredictionRequestBuilder, PredictionResult, RankedLabel,
};
use storage::Storage;

#[tokio::test]
async fn state_survives_reopening_the_database() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("client.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let mut builder = PredictionRequestBuilder::default();
    builder.push("Ph".into(), 5.8);
    builder.push("PRECTOTCORR-W".into(), 2.1);
    let submitted = builder.build();

    {
        let storage = Storage::new(&database_url).await.expect("db");
        storage.save_last_inputs(&submitted).await.expect("save");
        storage
            .append_history(
                HistoryEntry {
                    ts: 1_700_000_000_000,
                    result: PredictionResult {
                        predicted_label: "Sorghum".to_string(),
                        predicted_label_index: Some(4),
                        confidence: Some(0.81),
                        top3: vec![RankedLabel {
                            label: "Sorghum".to_string(),
                            probability: 0.81,
                        }],
                    },
                },
                50,
            )
            .await
            .expect("append");
        storage.pool().close().await;
    }

    let reopened = Storage::new(&database_url).await.expect("reopen");
    let last = reopened
        .load_last_inputs()
        .await
        .expect("load")
        .expect("present");
    assert_eq!(last.get(&FeatureName::from("Ph")), Some(&5.8));
    assert_eq!(last.get(&FeatureName::from("PRECTOTCORR-W")), Some(&2.1));

    let history = reopened.load_history().await.expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].result.predicted_label, "Sorghum");
    assert_eq!(history[0].result.top3[0].probability, 0.81);
}
