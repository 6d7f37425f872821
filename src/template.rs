use askama_actix::Template;

const PAGINATOR_LOOK_AHEAD: i64 = 2;

/// Page-number pagination state shared by list views.
/// Renders as: 1 ... 4 5 [6] 7 8 ... 13
#[derive(Debug)]
pub struct Paginator {
    pub base_url: String,
    pub this_page: i64,
    pub page_count: i64,
}

#[derive(Template)]
#[template(path = "util/paginator.html")]
struct PaginatorTemplate<'a> {
    paginator: &'a Paginator,
}

pub trait PaginatorToHtml {
    fn as_html(&self) -> String;
    fn has_pages(&self) -> bool;
    fn is_current_page(&self, page: &i64) -> bool;
    /// Page numbers to render; `None` marks a gap.
    fn get_page_links(&self) -> Vec<Option<i64>>;
}

impl PaginatorToHtml for Paginator {
    fn has_pages(&self) -> bool {
        self.page_count > 1
    }

    fn is_current_page(&self, page: &i64) -> bool {
        *page == self.this_page
    }

    fn get_page_links(&self) -> Vec<Option<i64>> {
        let mut links = Vec::new();
        let window_start = (self.this_page - PAGINATOR_LOOK_AHEAD).max(1);
        let window_end = (self.this_page + PAGINATOR_LOOK_AHEAD).min(self.page_count);

        if window_start > 1 {
            links.push(Some(1));
            if window_start > 2 {
                links.push(None);
            }
        }
        for page in window_start..=window_end {
            links.push(Some(page));
        }
        if window_end < self.page_count {
            if window_end < self.page_count - 1 {
                links.push(None);
            }
            links.push(Some(self.page_count));
        }
        links
    }

    fn as_html(&self) -> String {
        if self.has_pages() {
            let mut buffer = String::new();
            let template = PaginatorTemplate { paginator: self };
            if template.render_into(&mut buffer).is_err() {
                "[Paginator Util Error]".to_owned()
            } else {
                buffer
            }
        } else {
            String::new()
        }
    }
}

/// Which 1-based page a list of `count` items with `per_page` items per
/// page ends on.
pub fn page_count(count: i64, per_page: i64) -> i64 {
    ((count.max(1) - 1) / per_page.max(1)) + 1
}
