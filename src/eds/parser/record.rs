//! Record decoding, shared by search hits and retrieve responses

use super::xml::XmlNode;
use crate::eds::markup::{MarkupOptions, to_html};
use crate::eds::models::{
    BibEntity, BibRelationships, CustomLink, FullText, FullTextLink, Identifier, Image,
    ImageQuickViewItem, Item, Language, Numbering, PartOf, PartialDate, Record, RecordInfo,
    Subject, Title,
};

/// Stand-in URL for `pdflink` entries that arrive without one
pub const PDF_PLACEHOLDER_URL: &str = "http://content.ebscohost.com";

/// Decode one `<Record>` element
///
/// `retrieve` enables the fields only the Retrieve call returns (full text
/// body and illustrations).
pub(crate) fn parse_record(node: &XmlNode, options: &MarkupOptions, retrieve: bool) -> Record {
    Record {
        result_id: node.child_text("ResultId").parse().ok(),
        an: node.path_text(&["Header", "An"]),
        db_id: node.path_text(&["Header", "DbId"]),
        db_label: node.path_text(&["Header", "DbLabel"]),
        pub_type: node.path_text(&["Header", "PubType"]),
        access_level: node.path_text(&["Header", "AccessLevel"]),
        plink: node.child_text("PLink"),
        images: node
            .list(&["ImageInfo"], "CoverArt")
            .into_iter()
            .map(parse_image)
            .collect(),
        full_text: node
            .child("FullText")
            .map(|ft| parse_full_text(ft, options, retrieve)),
        custom_links: node
            .list(&["CustomLinks"], "CustomLink")
            .into_iter()
            .map(parse_custom_link)
            .collect(),
        items: node
            .list(&["Items"], "Item")
            .into_iter()
            .map(|item| parse_item(item, options))
            .collect(),
        record_info: node
            .path(&["RecordInfo", "BibRecord"])
            .map(parse_record_info),
        image_quick_view: node
            .list(&["ImageQuickViewItems"], "ImageQuickViewItem")
            .into_iter()
            .map(|iqv| ImageQuickViewItem {
                db_id: iqv.child_text("DbId"),
                an: iqv.child_text("An"),
                item_type: iqv.child_text("Type"),
                url: iqv.child_text("Url"),
            })
            .collect(),
        illustrations: if retrieve {
            node.list(&["IllustrationInfo", "Images"], "Image")
                .into_iter()
                .map(parse_image)
                .collect()
        } else {
            Vec::new()
        },
    }
}

fn parse_image(node: &XmlNode) -> Image {
    Image {
        size: node.child_text("Size"),
        target: node.child_text("Target"),
    }
}

fn parse_full_text(node: &XmlNode, options: &MarkupOptions, retrieve: bool) -> FullText {
    let links = node
        .list(&["Links"], "Link")
        .into_iter()
        .map(|link| {
            let link_type = link.child_text("Type");
            let mut url = link.child_text("Url");
            if url.is_empty() && link_type == "pdflink" {
                url = PDF_PLACEHOLDER_URL.to_string();
            }
            FullTextLink { link_type, url }
        })
        .collect();

    FullText {
        available: node.path_text(&["Text", "Availability"]) == "1",
        links,
        value: retrieve.then(|| to_html(&node.path_text(&["Text", "Value"]), None, options)),
    }
}

fn parse_custom_link(node: &XmlNode) -> CustomLink {
    CustomLink {
        category: node.child_text("Category"),
        icon: node.child_text("Icon"),
        mouse_over_text: node.child_text("MouseOverText"),
        name: node.child_text("Name"),
        text: node.child_text("Text"),
        url: node.child_text("Url"),
    }
}

fn parse_item(node: &XmlNode, options: &MarkupOptions) -> Item {
    let group = node.child_text("Group");
    let data = to_html(&node.child_text("Data"), Some(&group), options);
    Item {
        name: node.child_text("Name"),
        label: node.child_text("Label"),
        group,
        data,
    }
}

fn parse_identifiers(entity: &XmlNode) -> Vec<Identifier> {
    entity
        .list(&["Identifiers"], "Identifier")
        .into_iter()
        .map(|id| Identifier {
            id_type: id.child_text("Type"),
            value: id.child_text("Value"),
        })
        .collect()
}

fn parse_titles(entity: &XmlNode) -> Vec<Title> {
    entity
        .list(&["Titles"], "Title")
        .into_iter()
        .map(|t| Title {
            title_full: t.child_text("TitleFull"),
            title_type: t.child_text("Type"),
        })
        .collect()
}

fn parse_record_info(bib_record: &XmlNode) -> RecordInfo {
    let bib_entity = bib_record
        .child("BibEntity")
        .map(|entity| BibEntity {
            identifiers: parse_identifiers(entity),
            languages: entity
                .list(&["Languages"], "Language")
                .into_iter()
                .map(|l| Language {
                    code: l.child_text("Code"),
                    text: l.child_text("Text"),
                })
                .collect(),
            page_count: entity.path_text(&["PhysicalDescription", "Pagination", "PageCount"]),
            start_page: entity.path_text(&["PhysicalDescription", "Pagination", "StartPage"]),
            subjects: entity
                .list(&["Subjects"], "Subject")
                .into_iter()
                .map(|s| Subject {
                    subject_full: s.child_text("SubjectFull"),
                    subject_type: s.child_text("Type"),
                })
                .collect(),
            titles: parse_titles(entity),
        })
        .unwrap_or_default();

    let relationships = bib_record
        .child("BibRelationships")
        .map(|rel| BibRelationships {
            contributors: rel
                .list(&["HasContributorRelationships"], "HasContributor")
                .into_iter()
                .map(|c| c.path_text(&["PersonEntity", "Name", "NameFull"]))
                .collect(),
            is_part_of: rel
                .list(&["IsPartOfRelationships"], "IsPartOf")
                .into_iter()
                .filter_map(|p| p.child("BibEntity"))
                .map(parse_part_of)
                .collect(),
        })
        .unwrap_or_default();

    RecordInfo {
        bib_entity,
        relationships,
    }
}

fn parse_part_of(entity: &XmlNode) -> PartOf {
    PartOf {
        dates: entity
            .list(&["Dates"], "Date")
            .into_iter()
            .map(|d| PartialDate {
                d: d.child_text("D"),
                m: d.child_text("M"),
                y: d.child_text("Y"),
                date_type: d.child_text("Type"),
            })
            .collect(),
        identifiers: parse_identifiers(entity),
        titles: parse_titles(entity),
        numbering: entity
            .list(&["Numbering"], "Number")
            .into_iter()
            .map(|n| Numbering {
                number_type: n.child_text("Type"),
                value: n.child_text("Value"),
            })
            .collect(),
    }
}
