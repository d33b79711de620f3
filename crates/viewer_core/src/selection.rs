use shared::domain::SelectionRange;

/// Merges `selections` into their bounding rectangle when every cell of that
/// rectangle is covered; otherwise returns them unchanged.
///
/// The coverage check walks the bounding box cell by cell.
pub fn try_combine_selections(selections: &[SelectionRange]) -> Vec<SelectionRange> {
    if selections.len() <= 1 {
        return selections.to_vec();
    }

    let Some(bounds) = bounding_range(selections) else {
        return selections.to_vec();
    };

    for row in bounds.from_row..=bounds.to_row {
        for cell in bounds.from_cell..=bounds.to_cell {
            if !selections.iter().any(|range| range.contains(row, cell)) {
                return selections.to_vec();
            }
        }
    }
    vec![bounds]
}

pub fn bounding_range(selections: &[SelectionRange]) -> Option<SelectionRange> {
    let first = selections.first()?;
    Some(
        selections
            .iter()
            .skip(1)
            .fold(*first, |acc, range| SelectionRange {
                from_row: acc.from_row.min(range.from_row),
                from_cell: acc.from_cell.min(range.from_cell),
                to_row: acc.to_row.max(range.to_row),
                to_cell: acc.to_cell.max(range.to_cell),
            }),
    )
}

#[cfg(test)]
#[path = "tests/selection_tests.rs"]
mod tests;
