//! Property tests for block ordering and TOC resolution over generated catalogs.

use catalog_press::{BlockKind, BuildOptions, Catalog, build_model_bundle};
use proptest::prelude::*;
use serde_json::{Value, json};

fn text() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 /-]{0,10}"
}

fn table() -> impl Strategy<Value = Value> {
    (
        prop::sample::select(vec!["technical", "acoustic", "dimensions", "pricing", "custom"]),
        prop::collection::vec(text(), 0..3),
        prop::collection::vec(prop::collection::vec(0u32..1000, 0..3), 0..3),
    )
        .prop_map(|(kind, keys, rows)| {
            let columns: Vec<Value> = keys.iter().map(|k| json!({"key": k})).collect();
            json!({"type": kind, "columns": columns, "rows": rows})
        })
}

fn model() -> impl Strategy<Value = Value> {
    (prop::option::of(text()), prop::option::of(0.0f64..1e6)).prop_map(|(sku, price)| {
        json!({"sku": sku, "name": "Model", "price": price})
    })
}

fn media() -> impl Strategy<Value = Value> {
    (text(), prop::sample::select(vec!["photo", "drawing", "curve"])).prop_map(|(file, kind)| {
        json!({"type": kind, "file": file, "dataset": {"series": [{"label": "a", "points": [[0, 1], [1, 0]]}]}})
    })
}

fn series() -> impl Strategy<Value = Value> {
    (
        text(),
        text(),
        text(),
        prop::collection::vec(table(), 0..3),
        prop::collection::vec(media(), 0..3),
        prop::collection::vec(model(), 0..4),
    )
        .prop_map(|(code, name, summary, tables, media, models)| {
            json!({
                "code": code, "name": name, "summary_md": summary, "hero": {"photo": code},
                "tables": tables, "media": media, "models": models
            })
        })
}

fn catalog() -> impl Strategy<Value = Catalog> {
    prop::collection::vec(
        (text(), text(), text(), prop::collection::vec(series(), 0..4)).prop_map(
            |(code, title, intro, series)| {
                json!({"code": code, "title": title, "intro_md": intro, "series": series})
            },
        ),
        0..4,
    )
    .prop_map(|sections| {
        serde_json::from_value(json!({"sections": sections})).expect("generated catalog is valid")
    })
}

proptest! {
    #[test]
    fn prop_orders_strictly_increase_and_parents_precede(
        cat in catalog(),
        include_cover in any::<bool>(),
        model_pages in any::<bool>(),
    ) {
        let bundle = build_model_bundle(cat, BuildOptions { include_cover, model_pages });
        prop_assert!(bundle.check_integrity().is_ok());

        let blocks = bundle.blocks();
        for pair in blocks.windows(2) {
            prop_assert!(pair[0].order < pair[1].order);
        }
        for block in blocks {
            if let Some(parent) = &block.parent_id {
                let parent = bundle.get(parent);
                prop_assert!(parent.is_some(), "dangling parent on {}", block.id);
                prop_assert!(parent.is_some_and(|p| p.order < block.order));
            }
        }
    }

    #[test]
    fn prop_model_pages_flag_controls_spec_tables(cat in catalog()) {
        let off = build_model_bundle(cat.clone(), BuildOptions { include_cover: true, model_pages: false });
        prop_assert_eq!(off.blocks_of(BlockKind::SpecTable).count(), 0);

        let with_sku: usize = cat
            .sections
            .iter()
            .flat_map(|s| &s.series)
            .flat_map(|s| &s.models)
            .filter(|m| !m.sku.trim().is_empty())
            .count();
        let on = build_model_bundle(cat, BuildOptions { include_cover: true, model_pages: true });
        prop_assert_eq!(on.blocks_of(BlockKind::SpecTable).count(), with_sku);
    }

    #[test]
    fn prop_toc_is_idempotent_and_two_level(cat in catalog()) {
        let sections = cat.sections.len();
        let bundle = build_model_bundle(cat, BuildOptions::default());
        let first = bundle.toc().unwrap();
        let second = bundle.toc().unwrap();
        prop_assert_eq!(&first, &second);

        prop_assert_eq!(first.len(), sections);
        for entry in &first {
            prop_assert_eq!(entry.level, 1);
            for child in &entry.children {
                prop_assert_eq!(child.level, 2);
                prop_assert!(child.children.is_empty());
            }
        }
    }
}
