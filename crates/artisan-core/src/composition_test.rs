use super::*;

fn ingredient(category_id: Uuid, kind: IngredientKind, cents: i64) -> IngredientRef {
    IngredientRef {
        id: Uuid::new_v4(),
        category_id,
        kind,
        price: Decimal::new(cents, 2),
    }
}

/// A complete, valid ingredient set for one category:
/// mold 10.00, color 2.50, aroma 4.00, essences 3.25 + 1.75.
fn valid_set(category_id: Uuid) -> Vec<IngredientRef> {
    vec![
        ingredient(category_id, IngredientKind::Mold, 1000),
        ingredient(category_id, IngredientKind::Color, 250),
        ingredient(category_id, IngredientKind::Aroma, 400),
        ingredient(category_id, IngredientKind::Essence, 325),
        ingredient(category_id, IngredientKind::Essence, 175),
    ]
}

fn ids(set: &[IngredientRef]) -> Vec<Uuid> {
    set.iter().map(|i| i.id).collect()
}

#[test]
fn compose_accepts_exact_composition_and_sums_price() {
    let category = Uuid::new_v4();
    let set = valid_set(category);

    let composition = compose(&ids(&set), category, &set).expect("valid composition");

    assert_eq!(composition.price, Decimal::new(2150, 2));
    assert_eq!(composition.ingredient_ids.len(), 5);
    assert!(composition
        .ingredient_ids
        .windows(2)
        .all(|pair| pair[0] <= pair[1]));
}

#[test]
fn compose_key_is_order_independent() {
    let category = Uuid::new_v4();
    let set = valid_set(category);
    let mut reversed = ids(&set);
    reversed.reverse();

    let a = compose(&ids(&set), category, &set).unwrap();
    let b = compose(&reversed, category, &set).unwrap();

    assert_eq!(a.composition_key, b.composition_key);
    assert_eq!(a.composition_key.split(',').count(), 5);
}

#[test]
fn compose_rejects_empty_request() {
    let category = Uuid::new_v4();
    assert_eq!(
        compose(&[], category, &valid_set(category)),
        Err(CompositionError::Empty)
    );
}

#[test]
fn compose_rejects_duplicate_ids() {
    let category = Uuid::new_v4();
    let set = valid_set(category);
    let mut requested = ids(&set);
    requested[4] = requested[3];

    assert_eq!(
        compose(&requested, category, &set),
        Err(CompositionError::Duplicate(requested[3]))
    );
}

#[test]
fn compose_rejects_unknown_ingredient() {
    let category = Uuid::new_v4();
    let set = valid_set(category);
    let missing = Uuid::new_v4();
    let mut requested = ids(&set);
    requested[0] = missing;

    assert_eq!(
        compose(&requested, category, &set),
        Err(CompositionError::NotFound(missing))
    );
}

#[test]
fn compose_rejects_ingredient_from_other_category() {
    let category = Uuid::new_v4();
    let mut set = valid_set(category);
    let foreign = ingredient(Uuid::new_v4(), IngredientKind::Color, 100);
    set[1] = foreign.clone();

    assert_eq!(
        compose(&ids(&set), category, &set),
        Err(CompositionError::WrongCategory {
            ingredient_id: foreign.id,
            category_id: category,
        })
    );
}

#[test]
fn compose_rejects_missing_essence() {
    let category = Uuid::new_v4();
    let set = valid_set(category);
    let requested = &ids(&set)[..4];

    assert_eq!(
        compose(requested, category, &set),
        Err(CompositionError::KindCount {
            kind: IngredientKind::Essence,
            expected: 2,
            actual: 1,
        })
    );
}

#[test]
fn compose_rejects_two_molds() {
    let category = Uuid::new_v4();
    let mut set = valid_set(category);
    set.push(ingredient(category, IngredientKind::Mold, 900));

    let err = compose(&ids(&set), category, &set).unwrap_err();
    assert_eq!(
        err,
        CompositionError::KindCount {
            kind: IngredientKind::Mold,
            expected: 1,
            actual: 2,
        }
    );
    assert_eq!(
        err.to_string(),
        "expected exactly 1 mold ingredient(s), got 2"
    );
}

#[test]
fn compose_rejects_three_essences_without_aroma() {
    let category = Uuid::new_v4();
    let mut set = valid_set(category);
    set[2] = ingredient(category, IngredientKind::Essence, 100);

    assert!(matches!(
        compose(&ids(&set), category, &set),
        Err(CompositionError::KindCount {
            kind: IngredientKind::Aroma,
            actual: 0,
            ..
        })
    ));
}

#[test]
fn compose_ignores_unrequested_rows() {
    let category = Uuid::new_v4();
    let set = valid_set(category);
    let mut found = set.clone();
    found.push(ingredient(category, IngredientKind::Mold, 5000));

    let composition = compose(&ids(&set), category, &found).unwrap();
    assert_eq!(composition.price, Decimal::new(2150, 2));
}

#[test]
fn ingredient_kind_parses_scent_alias() {
    assert_eq!(
        "scent".parse::<IngredientKind>().unwrap(),
        IngredientKind::Aroma
    );
    assert_eq!(
        " Essence ".parse::<IngredientKind>().unwrap(),
        IngredientKind::Essence
    );
    assert!("glitter".parse::<IngredientKind>().is_err());
}

#[test]
fn ingredient_kind_serde_uses_lowercase_names() {
    let json = serde_json::to_string(&IngredientKind::Aroma).unwrap();
    assert_eq!(json, "\"aroma\"");
    let parsed: IngredientKind = serde_json::from_str("\"scent\"").unwrap();
    assert_eq!(parsed, IngredientKind::Aroma);
}
