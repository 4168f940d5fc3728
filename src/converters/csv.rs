use super::decode_text;
use crate::engine::ConvertOptions;
use crate::reader::{ConversionResult, ConverterError, DocumentConverter};
use crate::stream_info::StreamInfo;
use ::csv::ReaderBuilder;

const EXTENSIONS: &[&str] = &[".csv"];
const MIME_PREFIXES: &[&str] = &["text/csv", "application/csv"];

/// First row is the header; short rows are padded, long rows truncated
pub struct CsvConverter;

impl DocumentConverter for CsvConverter {
    fn name(&self) -> &str {
        "csv"
    }

    fn accepts(&self, _input: &[u8], info: &StreamInfo) -> bool {
        info.has_extension(EXTENSIONS) || info.has_mime_prefix(MIME_PREFIXES)
    }

    fn convert(
        &self,
        input: &[u8],
        info: &StreamInfo,
        _options: &ConvertOptions,
    ) -> Result<ConversionResult, ConverterError> {
        let text = decode_text(input, info);
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut rows: Vec<Vec<String>> = Vec::new();
        for record in rdr.records() {
            let record =
                record.map_err(|e| ConverterError::new(format!("CSV parsing error: {}", e)))?;
            rows.push(record.iter().map(escape_cell).collect());
        }

        let Some(header) = rows.first() else {
            return Ok(ConversionResult::default());
        };
        let width = header.len();

        let mut markdown = String::new();
        for (i, row) in rows.iter().enumerate() {
            markdown.push('|');
            for j in 0..width {
                markdown.push(' ');
                markdown.push_str(row.get(j).map(String::as_str).unwrap_or(""));
                markdown.push_str(" |");
            }
            markdown.push('\n');

            if i == 0 {
                markdown.push('|');
                for _ in 0..width {
                    markdown.push_str(" --- |");
                }
                markdown.push('\n');
            }
        }

        Ok(ConversionResult::new(markdown))
    }
}

fn escape_cell(cell: &str) -> String {
    cell.trim().replace('|', "\\|").replace('\n', "<br>")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv_info() -> StreamInfo {
        StreamInfo {
            mime_type: Some("text/csv".to_string()),
            ..StreamInfo::default()
        }
    }

    #[test]
    fn test_table_with_padding() {
        let input = b"name,qty\napple,3\npear\n";
        let result = CsvConverter
            .convert(input, &csv_info(), &ConvertOptions::default())
            .unwrap();
        assert_eq!(
            result.markdown,
            "| name | qty |\n| --- | --- |\n| apple | 3 |\n| pear |  |\n"
        );
    }

    #[test]
    fn test_pipes_escaped() {
        let input = b"expr\na|b\n";
        let result = CsvConverter
            .convert(input, &csv_info(), &ConvertOptions::default())
            .unwrap();
        assert!(result.markdown.contains("| a\\|b |"));
    }

    #[test]
    fn test_empty_input() {
        let result = CsvConverter
            .convert(b"", &csv_info(), &ConvertOptions::default())
            .unwrap();
        assert_eq!(result.markdown, "");
    }
}
