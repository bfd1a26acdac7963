//! Structural checks over a loaded [`Document`].
//!
//! Not a schema validator: only the invariants the reader cannot enforce
//! while loading are checked here. Warnings leave the document usable;
//! errors mean some part of it has no well-defined geometry.

use std::fmt;

use crate::model::{Document, Node, PageSize, Table};

/// One finding, with a path-like location such as `body/table[0]/row[2]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub location: String,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

#[derive(Debug, Default)]
pub struct Validator {
    pub warnings: Vec<ValidationIssue>,
    pub errors: Vec<ValidationIssue>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    fn warning(&mut self, location: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationIssue {
            location: location.into(),
            message: message.into(),
        });
    }

    fn error(&mut self, location: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationIssue {
            location: location.into(),
            message: message.into(),
        });
    }

    /// Check `doc`, replacing the findings of any earlier call. Returns
    /// `false` iff at least one error was found.
    pub fn validate(&mut self, doc: &Document) -> bool {
        self.warnings.clear();
        self.errors.clear();
        if doc.nodes.is_empty() {
            self.warning("body", "document has no content nodes");
        }

        self.check_nodes(&doc.nodes, "body");
        for hf in &doc.headers_footers {
            self.check_nodes(&hf.nodes, &hf.part);
        }

        for (i, section) in doc.sections.iter().enumerate() {
            if section.page_size != PageSize::Custom {
                continue;
            }
            let location = format!("section[{i}]");
            if section.custom_width.is_none() {
                self.error(&location, "custom page size without customWidth");
            }
            if section.custom_height.is_none() {
                self.error(&location, "custom page size without customHeight");
            }
        }

        for r in &doc.unresolved_references {
            self.warning(
                r.part.as_str(),
                format!("relationship {} is referenced but not defined", r.id),
            );
        }

        if !self.warnings.is_empty() || !self.errors.is_empty() {
            log::debug!(
                "validation: {} warnings, {} errors",
                self.warnings.len(),
                self.errors.len()
            );
        }
        self.errors.is_empty()
    }

    fn check_nodes(&mut self, nodes: &[Node], path: &str) {
        let mut tables = 0;
        let mut lists = 0;
        for node in nodes {
            match node {
                Node::Table(table) => {
                    self.check_table(table, &format!("{path}/table[{tables}]"));
                    tables += 1;
                }
                Node::List(list) => {
                    let list_path = format!("{path}/list[{lists}]");
                    for (i, item) in list.items.iter().enumerate() {
                        self.check_nodes(&item.children, &format!("{list_path}/item[{i}]"));
                    }
                    lists += 1;
                }
                Node::Shape(shape) => self.check_nodes(&shape.children, path),
                Node::Paragraph(p) => self.check_nodes(&p.children, path),
                Node::Run(_) | Node::Image(_) => {}
            }
        }
    }

    /// Rows are compared by raw cell count: a cell spanning several grid
    /// columns still counts once.
    fn check_table(&mut self, table: &Table, path: &str) {
        let grid = table.grid_columns.len();
        for (r, row) in table.rows.iter().enumerate() {
            if row.cells.len() != grid {
                self.warning(
                    format!("{path}/row[{r}]"),
                    format!(
                        "row has {} cells but the table grid declares {grid} columns",
                        row.cells.len()
                    ),
                );
            }
            for (c, cell) in row.cells.iter().enumerate() {
                self.check_nodes(&cell.children, &format!("{path}/row[{r}]/cell[{c}]"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::docx::rels::ContentTypes;
    use crate::model::{
        Borders, CellVAlign, PassThroughParts, SectionProperties, TableCell, TableRow,
        UnresolvedReference, VMerge,
    };

    fn cell(col_span: u16) -> TableCell {
        TableCell {
            width: None,
            children: Vec::new(),
            col_span,
            row_span: 1,
            v_merge: VMerge::None,
            borders: Borders::default(),
            shading: None,
            v_align: CellVAlign::Top,
        }
    }

    fn document(nodes: Vec<Node>, sections: Vec<SectionProperties>) -> Document {
        Document {
            nodes,
            sections,
            headers_footers: Vec::new(),
            fonts: Vec::new(),
            picture_bullets: HashMap::new(),
            content_types: ContentTypes::default(),
            parts: PassThroughParts::default(),
            unresolved_references: Vec::new(),
        }
    }

    fn table(grid: Vec<f32>, rows: Vec<Vec<TableCell>>) -> Node {
        Node::Table(Table {
            style_id: None,
            grid_columns: grid,
            rows: rows
                .into_iter()
                .map(|cells| TableRow {
                    cells,
                    height: None,
                    height_exact: false,
                    is_header: false,
                })
                .collect(),
            indent: 0.0,
        })
    }

    #[test]
    fn empty_document_warns() {
        let mut v = Validator::new();
        assert!(v.validate(&document(Vec::new(), Vec::new())));
        assert_eq!(v.warnings.len(), 1);
        assert!(v.errors.is_empty());
    }

    #[test]
    fn spanning_cell_counts_once() {
        let doc = document(vec![table(vec![50.0, 50.0], vec![vec![cell(2)]])], Vec::new());
        let mut v = Validator::new();
        assert!(v.validate(&doc));
        assert_eq!(v.warnings.len(), 1);
        assert_eq!(v.warnings[0].location, "body/table[0]/row[0]");
    }

    #[test]
    fn matching_rows_are_clean() {
        let doc = document(
            vec![table(vec![50.0, 50.0], vec![vec![cell(1), cell(1)]; 2])],
            Vec::new(),
        );
        let mut v = Validator::new();
        assert!(v.validate(&doc));
        assert!(v.warnings.is_empty());
    }

    #[test]
    fn nested_tables_are_checked() {
        let mut outer = cell(1);
        outer.children.push(table(vec![10.0], vec![vec![cell(1), cell(1)]]));
        let doc = document(vec![table(vec![50.0], vec![vec![outer]])], Vec::new());
        let mut v = Validator::new();
        v.validate(&doc);
        assert_eq!(v.warnings.len(), 1);
        assert_eq!(v.warnings[0].location, "body/table[0]/row[0]/cell[0]/table[0]/row[0]");
    }

    #[test]
    fn custom_size_needs_both_dimensions() {
        let section = SectionProperties {
            page_size: PageSize::Custom,
            custom_width: None,
            custom_height: Some(700.0),
            ..SectionProperties::default()
        };
        let doc = document(Vec::new(), vec![section]);
        let mut v = Validator::new();
        assert!(!v.validate(&doc));
        assert_eq!(v.errors.len(), 1);
        assert!(v.errors[0].message.contains("customWidth"));
    }

    #[test]
    fn reuse_reports_only_the_latest_document() {
        let broken = document(
            Vec::new(),
            vec![SectionProperties {
                page_size: PageSize::Custom,
                ..SectionProperties::default()
            }],
        );
        let clean = document(
            vec![table(vec![50.0], vec![vec![cell(1)]])],
            Vec::new(),
        );
        let mut v = Validator::new();
        assert!(!v.validate(&broken));
        assert_eq!(v.errors.len(), 2);
        assert!(v.validate(&clean));
        assert!(v.errors.is_empty() && v.warnings.is_empty());
    }

    #[test]
    fn dangling_references_warn() {
        let mut doc = document(Vec::new(), Vec::new());
        doc.unresolved_references.push(UnresolvedReference {
            part: "word/document.xml".into(),
            id: "rId42".into(),
        });
        let mut v = Validator::new();
        assert!(v.validate(&doc));
        assert_eq!(v.warnings.len(), 2);
        assert!(v.warnings[1].message.contains("rId42"));
    }
}
