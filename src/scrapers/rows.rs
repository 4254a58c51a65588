use scraper::{ElementRef, Selector};

/// Extracts every row of a table as trimmed cell text, header and data cells
/// alike, in document order.
///
/// Purely structural: no row is dropped here, even ones too short to be
/// data. Deciding what a row means belongs to the field mapper.
pub fn extract_rows(table: ElementRef<'_>) -> Vec<Vec<String>> {
    let row_selector = Selector::parse("tr").unwrap();
    let cell_selector = Selector::parse("td, th").unwrap();

    table
        .select(&row_selector)
        .map(|row| {
            row.select(&cell_selector)
                .map(|cell| cell.text().collect::<String>().trim().to_string())
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn first_table(doc: &Html) -> ElementRef<'_> {
        let selector = Selector::parse("table").unwrap();
        doc.select(&selector).next().unwrap()
    }

    #[test]
    fn test_extract_rows_trims_and_keeps_order() {
        let doc = Html::parse_document(
            "<table><tr><th> מיקום </th><th>קבוצה</th></tr>\
             <tr><td> 1 </td><td>  בני יהודה  </td></tr></table>",
        );
        let rows = extract_rows(first_table(&doc));

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["מיקום", "קבוצה"]);
        assert_eq!(rows[1], vec!["1", "בני יהודה"]);
    }

    #[test]
    fn test_extract_rows_mixes_header_and_data_cells() {
        let doc = Html::parse_document(
            "<table><tr><th>1</th><td>Team A</td><td>5</td></tr></table>",
        );
        let rows = extract_rows(first_table(&doc));

        assert_eq!(rows, vec![vec!["1", "Team A", "5"]]);
    }

    #[test]
    fn test_short_rows_pass_through() {
        let doc = Html::parse_document(
            "<table><tr><td>only</td></tr><tr><td>1</td><td>2</td></tr></table>",
        );
        let rows = extract_rows(first_table(&doc));

        // The extractor never filters; downstream stages reject short rows
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["only"]);
    }
}
