//! Property-based tests for expansion, similarity and fusion.

use proptest::prelude::*;

use invsearch::core::ItemId;
use invsearch::search::embeddings::{cosine_similarity, l2_normalize};
use invsearch::search::expand::parse_or_expression;
use invsearch::search::{
    EmbeddingProvider, FusionWeights, HashEmbedder, QueryExpander, Signal, SynonymTable, fuse_scored,
};

fn arb_groups() -> impl Strategy<Value = Vec<Vec<String>>> {
    prop::collection::vec(prop::collection::vec("[a-f]{1,3}", 1..5), 1..6)
}

fn arb_vector(len: usize) -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(-100.0f32..100.0, len)
}

/// Unique ids with integer-valued scores.
fn arb_signal(id_base: ItemId) -> impl Strategy<Value = Vec<(ItemId, f32)>> {
    prop::collection::vec(1u32..1000, 0..12).prop_map(move |scores| {
        scores
            .into_iter()
            .enumerate()
            .map(|(i, score)| (id_base + i as ItemId, score as f32))
            .collect()
    })
}

proptest! {
    #[test]
    fn synonym_relation_is_symmetric(groups in arb_groups()) {
        let table = SynonymTable::from_groups(&groups);
        for group in &groups {
            for term in group {
                for related in table.related_terms(term) {
                    prop_assert!(
                        table.related_terms(related).contains(term.as_str()),
                        "{term} -> {related} is one-way"
                    );
                }
            }
        }
    }

    #[test]
    fn expansion_keeps_words_and_is_order_independent(
        words in prop::collection::vec("[a-z]{1,8}", 1..5)
    ) {
        let expander = QueryExpander::default();
        let forward = expander.expand(&words.join(" "));
        let mut reversed_words = words.clone();
        reversed_words.reverse();
        let reversed = expander.expand(&reversed_words.join(" "));

        prop_assert_eq!(forward.to_query_string(), reversed.to_query_string());
        for word in &words {
            prop_assert!(forward.terms().contains(word));
            prop_assert!(forward.covers(word));
        }
        prop_assert!(parse_or_expression(&forward.to_query_string()).is_ok());
    }

    #[test]
    fn cosine_similarity_is_bounded(a in arb_vector(8), b in arb_vector(8)) {
        let similarity = cosine_similarity(&a, &b);
        prop_assert!((-1.0..=1.0).contains(&similarity));
    }

    #[test]
    fn normalized_vector_is_self_similar(mut v in arb_vector(16)) {
        prop_assume!(v.iter().any(|x| x.abs() > 1e-3));
        l2_normalize(&mut v);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        prop_assert!((norm - 1.0).abs() < 1e-4);
        prop_assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn hash_provider_yields_unit_vectors_or_errors(text in ".{0,64}") {
        let embedder = HashEmbedder::new(64);
        let raw = embedder.embed(&text);
        match embedder.embed_text(&text) {
            Ok(vector) => {
                prop_assert_eq!(vector.len(), 64);
                let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
                prop_assert!((norm - 1.0).abs() < 1e-4);
            }
            Err(_) => prop_assert!(raw.iter().all(|x| *x == 0.0)),
        }
    }

    #[test]
    fn fused_scores_are_bounded_and_sorted(
        lexical in arb_signal(1),
        visual in arb_signal(6),
        text in 0.0f32..2.0,
        vis in 0.0f32..2.0,
        limit in 0usize..30,
    ) {
        let lexical = Signal::from_results(lexical);
        let visual = Signal::from_results(visual);
        let weights = FusionWeights::new(text, vis);
        let effective = weights.effective(&visual);
        let fused = fuse_scored(&lexical, &visual, weights, limit);

        prop_assert!(fused.len() <= limit);
        for pair in fused.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
        }
        for result in &fused {
            prop_assert!(result.score >= 0.0);
            prop_assert!(result.score <= effective.text + effective.visual + 1e-5);
        }
    }

    #[test]
    fn zero_visual_weight_keeps_lexical_order(
        lexical in arb_signal(1),
        visual in arb_signal(100),
    ) {
        let mut expected = lexical.clone();
        expected.sort_by(|a, b| b.1.total_cmp(&a.1));
        let expected: Vec<ItemId> = expected.into_iter().map(|(id, _)| id).collect();

        let fused = fuse_scored(
            &Signal::from_results(lexical),
            &Signal::from_results(visual),
            FusionWeights::new(1.0, 0.0),
            200,
        );
        let ids: Vec<ItemId> = fused.iter().map(|r| r.item_id).collect();
        prop_assert_eq!(&ids[..expected.len()], expected.as_slice());
    }
}
