use crate::domain::model::MappingEntry;
use std::collections::BTreeMap;

const STYLE: &str = r#"<style>
  body { font-family: -apple-system, system-ui, sans-serif; max-width: 1400px; margin: 0 auto; padding: 20px; background: #f5f5f5; }
  h1 { font-size: 24px; }
  h2 { font-size: 18px; margin-top: 40px; border-bottom: 2px solid #333; padding-bottom: 8px; }
  .grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(280px, 1fr)); gap: 16px; margin-top: 16px; }
  .card { background: white; border-radius: 8px; overflow: hidden; box-shadow: 0 1px 3px rgba(0,0,0,0.1); }
  .card img { width: 100%; height: auto; display: block; border-bottom: 1px solid #eee; }
  .card .info { padding: 10px 12px; }
  .card .pid { font-weight: 600; font-size: 14px; color: #111; }
  .card .topic { font-size: 13px; color: #666; margin-top: 2px; }
  .card .file { font-size: 11px; color: #aaa; margin-top: 4px; font-family: monospace; }
  .ok { border-left: 4px solid #4caf50; }
  .missing { border-left: 4px solid #ffb300; }
  .missing .label { background: #ffe664; padding: 8px 12px; font-weight: 600; }
  .summary { background: white; padding: 16px; border-radius: 8px; margin-bottom: 20px; }
  .summary span { font-weight: 600; }
  .tip { background: #e3f2fd; padding: 12px; border-radius: 8px; margin-top: 8px; font-size: 13px; }
</style>"#;

/// 一張缺少目錄記錄的圖片
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingCard {
    pub label: String,
    pub image: String,
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn image_src(image_base: &str, image: &str) -> String {
    if image_base.is_empty() {
        image.to_string()
    } else {
        format!("{}/{}", image_base.trim_end_matches('/'), image)
    }
}

fn page_head(title: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n{}\n</head><body>\n<h1>{}</h1>\n",
        escape_html(title),
        STYLE,
        escape_html(title)
    )
}

/// 對應結果預覽：依年份分組，每筆一張卡片
pub fn render_mapping_preview(entries: &[MappingEntry], image_base: &str) -> String {
    let mut by_year: BTreeMap<i32, Vec<&MappingEntry>> = BTreeMap::new();
    for entry in entries {
        by_year.entry(entry.year).or_default().push(entry);
    }

    let mut html = page_head("Paper-Image Mapping Preview");
    html.push_str(&format!(
        "<div class=\"summary\">\n  <p>Total mappings: <span>{}</span></p>\n  \
<p>Verify: the paper number printed on each exam sheet should match the paper_number shown below it.</p>\n</div>\n\
<div class=\"tip\">\n  Mapping method: images are ordered sequentially (1.1, 1.2, 1.3, 2.1, 2.2, 2.3, ...). \
Papers NOT in the catalog are skipped, keeping the rest aligned.\n</div>\n",
        entries.len()
    ));

    for (year, year_entries) in &by_year {
        html.push_str(&format!("<h2>{} ({} papers mapped)</h2>\n", year, year_entries.len()));
        html.push_str("<div class=\"grid\">\n");
        for entry in year_entries {
            html.push_str(&format!(
                "  <div class=\"card ok\">\n    <img src=\"{}\" loading=\"lazy\">\n    <div class=\"info\">\n      \
<div class=\"pid\">{} &mdash; {}</div>\n      <div class=\"topic\">{}</div>\n      <div class=\"file\">{}</div>\n    </div>\n  </div>\n",
                escape_html(&image_src(image_base, &entry.image)),
                escape_html(&entry.paper_id),
                escape_html(&entry.paper_number),
                escape_html(&entry.topic),
                escape_html(&entry.image),
            ));
        }
        html.push_str("</div>\n");
    }

    html.push_str("</body></html>\n");
    html
}

/// 缺少記錄的圖片清單，每張附上 MISSING 標籤，供人工補錄
pub fn render_missing_grid(cards: &[MissingCard], image_base: &str) -> String {
    let mut html = page_head("Missing Papers");
    html.push_str(&format!(
        "<div class=\"summary\">\n  <p>Images without a catalog record: <span>{}</span></p>\n</div>\n<div class=\"grid\">\n",
        cards.len()
    ));

    for card in cards {
        html.push_str(&format!(
            "  <div class=\"card missing\">\n    <div class=\"label\">MISSING: {}</div>\n    <img src=\"{}\" loading=\"lazy\">\n    \
<div class=\"info\"><div class=\"file\">{}</div></div>\n  </div>\n",
            escape_html(&card.label),
            escape_html(&image_src(image_base, &card.image)),
            escape_html(&card.image),
        ));
    }

    html.push_str("</div>\n</body></html>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(year: i32, paper_id: &str, topic: &str, image: &str) -> MappingEntry {
        MappingEntry {
            paper_id: paper_id.to_string(),
            db_id: None,
            year,
            paper_number: "1.1".to_string(),
            topic: topic.to_string(),
            image: image.to_string(),
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"Tom & Jerry's"</b>"#),
            "&lt;b&gt;&quot;Tom &amp; Jerry&#39;s&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_preview_groups_by_year_and_escapes() {
        let entries = vec![
            entry(2016, "2016-1.1", "Food & <drink>", "2016/page-01.webp"),
            entry(2013, "2013-1.1", "Travel", "2013/page-01.webp"),
        ];
        let html = render_mapping_preview(&entries, "file:///data/images");

        assert!(html.contains("Total mappings: <span>2</span>"));
        let pos_2013 = html.find("<h2>2013 (1 papers mapped)</h2>").unwrap();
        let pos_2016 = html.find("<h2>2016 (1 papers mapped)</h2>").unwrap();
        assert!(pos_2013 < pos_2016);
        assert!(html.contains("<h2>2016 (1 papers mapped)</h2>\n<div class=\"grid\">\n  <div class=\"card ok\">"));
        assert!(html.ends_with("</div>\n</body></html>\n"));
        assert!(html.contains("Food &amp; &lt;drink&gt;"));
        assert!(html.contains("src=\"file:///data/images/2016/page-01.webp\""));
    }

    #[test]
    fn test_missing_grid_labels_cards() {
        let cards = vec![MissingCard {
            label: "2016-1.2".to_string(),
            image: "2016/page-02.webp".to_string(),
        }];
        let html = render_missing_grid(&cards, "");
        assert!(html.contains("MISSING: 2016-1.2"));
        assert!(html.contains("src=\"2016/page-02.webp\""));
    }
}
