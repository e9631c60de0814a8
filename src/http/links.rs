//! Construction and interpretation of hierarchical resource links such as
//! `dbs/mydb/colls/mycoll/docs/mydoc`.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

// Path-segment escaping. Resource names may contain characters that would
// otherwise break the link structure or the request URL.
const SEGMENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'=')
    .remove(b':')
    .remove(b'@');

fn escape(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT_ENCODE_SET).to_string()
}

pub fn db_link(db_name: &str) -> String {
    format!("dbs/{}", escape(db_name))
}

pub fn dbs_link() -> String {
    "dbs".to_string()
}

pub fn coll_link(db_name: &str, coll_name: &str) -> String {
    format!("dbs/{}/colls/{}", escape(db_name), escape(coll_name))
}

pub fn colls_link(db_name: &str) -> String {
    format!("dbs/{}/colls", escape(db_name))
}

pub fn docs_link(db_name: &str, coll_name: &str) -> String {
    format!("{}/docs", coll_link(db_name, coll_name))
}

pub fn doc_link(db_name: &str, coll_name: &str, doc_id: &str) -> String {
    format!("{}/docs/{}", coll_link(db_name, coll_name), escape(doc_id))
}

pub fn triggers_link(db_name: &str, coll_name: &str) -> String {
    format!("{}/triggers", coll_link(db_name, coll_name))
}

pub fn trigger_link(db_name: &str, coll_name: &str, trigger_name: &str) -> String {
    format!("{}/triggers/{}", coll_link(db_name, coll_name), escape(trigger_name))
}

pub fn sprocs_link(db_name: &str, coll_name: &str) -> String {
    format!("{}/sprocs", coll_link(db_name, coll_name))
}

pub fn sproc_link(db_name: &str, coll_name: &str, sproc_name: &str) -> String {
    format!("{}/sprocs/{}", coll_link(db_name, coll_name), escape(sproc_name))
}

pub fn offer_link(offer_id: &str) -> String {
    if offer_id.is_empty() {
        return "offers".to_string();
    }
    format!("offers/{}", escape(offer_id))
}

pub fn pkranges_link(db_name: &str, coll_name: &str) -> String {
    format!("{}/pkranges", coll_link(db_name, coll_name))
}

/// Extracts the `(resource link, resource type)` pair used in the payload of
/// the authorization header.
///
/// The returned link only works with addressing by user ids, as used
/// throughout this crate. Addressing with self links requires different
/// capitalization.
pub(crate) fn resource_type_from_link(link: &str) -> (String, String) {
    if link.is_empty() {
        return (String::new(), String::new());
    }

    let mut link = link.to_string();
    if !link.starts_with('/') {
        link.insert(0, '/');
    }
    if !link.ends_with('/') {
        link.push('/');
    }

    let parts: Vec<&str> = link.split('/').collect();
    let l = parts.len();

    // Offers are inconsistent with the rest of the API: the service
    // addresses them case-insensitively, so the signed link is lowercased.
    if parts[1] == "offers" {
        return (parts[2].to_lowercase(), parts[1].to_string());
    }

    if l % 2 == 0 {
        (parts[1..l - 1].join("/"), parts[l - 3].to_string())
    } else {
        // E.g. /dbs/myDb/colls/: the link does not point to a specific
        // resource but to the collection of resources under it.
        (parts[1..l - 2].join("/"), parts[l - 2].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_type() {
        let cases = [
            ("/dbs", "", "dbs"),
            ("dbs", "", "dbs"),
            ("/dbs/myDb", "dbs/myDb", "dbs"),
            ("/dbs/myDb/", "dbs/myDb", "dbs"),
            ("/dbs/myDb/colls", "dbs/myDb", "colls"),
            ("/dbs/myDb/colls/", "dbs/myDb", "colls"),
            ("/dbs/myDb/colls/someCol", "dbs/myDb/colls/someCol", "colls"),
            ("/dbs/myDb/colls/someCol/", "dbs/myDb/colls/someCol", "colls"),
            ("/dbs/myDb/colls/myColl/docs/", "dbs/myDb/colls/myColl", "docs"),
            ("/dbs/db/colls/col/docs/doc", "dbs/db/colls/col/docs/doc", "docs"),
            ("/offers/myOffer", "myoffer", "offers"),
            ("/offers/CASING", "casing", "offers"),
            ("", "", ""),
        ];
        for (input, link, resource_type) in cases {
            let (got_link, got_type) = resource_type_from_link(input);
            assert_eq!(got_link, link, "link for {input:?}");
            assert_eq!(got_type, resource_type, "type for {input:?}");
        }
    }

    #[test]
    fn links_are_url_safe() {
        assert_eq!(
            trigger_link("mydb", "mycoll", "\r"),
            "dbs/mydb/colls/mycoll/triggers/%0D"
        );
        assert_eq!(
            coll_link("mydb", "{'collection':'mycoll'}"),
            "dbs/mydb/colls/%7B%27collection%27:%27mycoll%27%7D"
        );
        assert_eq!(
            docs_link("mydb", "<div>mycoll</div>"),
            "dbs/mydb/colls/%3Cdiv%3Emycoll%3C%2Fdiv%3E/docs"
        );
        assert_eq!(
            doc_link("mydb", "mycoll", "id?additionalParameters=true"),
            "dbs/mydb/colls/mycoll/docs/id%3FadditionalParameters=true"
        );
        assert_eq!(
            sprocs_link("mydb", "<div>mycoll</div>"),
            "dbs/mydb/colls/%3Cdiv%3Emycoll%3C%2Fdiv%3E/sprocs"
        );
        assert_eq!(
            sproc_link("mydb", "<div>mycoll</div>", "thesproc"),
            "dbs/mydb/colls/%3Cdiv%3Emycoll%3C%2Fdiv%3E/sprocs/thesproc"
        );
    }
}
