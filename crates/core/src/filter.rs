//! Catalog filtering for the presentation view.

use tabcast_protocol::{Source, SourceFilter, SourceId, ViewEntry};

use crate::guard::is_allow_listed;

/// Inputs to [`filtered_view`] besides the catalog itself.
#[derive(Debug, Clone, Copy)]
pub struct ViewOptions<'a> {
	pub filter: SourceFilter,
	/// When false, only audible or allow-listed sources are visible.
	pub show_all: bool,
	pub allow_domains: &'a [String],
	pub selection: Option<SourceId>,
	/// Source the streaming session is bound to, if one is running.
	pub bound: Option<SourceId>,
}

/// Builds the annotated view of `catalog`.
///
/// Visibility is decided first (`show_all` and the allow-list), then the
/// audibility filter. Catalog order is preserved and the catalog is never
/// modified.
pub fn filtered_view(catalog: &[Source], opts: &ViewOptions<'_>) -> Vec<ViewEntry> {
	catalog
		.iter()
		.filter(|source| opts.show_all || is_visible(source, opts.allow_domains))
		.filter(|source| opts.filter.admits(source.audible))
		.map(|source| ViewEntry {
			id: source.id,
			title: source.display_title().to_string(),
			url: source.url.clone(),
			audible: source.audible,
			fav_icon_url: source.fav_icon_url.clone(),
			selected: opts.selection == Some(source.id),
			disabled: opts.bound.is_some_and(|bound| bound != source.id),
		})
		.collect()
}

fn is_visible(source: &Source, allow_domains: &[String]) -> bool {
	source.audible
		|| source
			.url
			.as_deref()
			.is_some_and(|url| is_allow_listed(url, allow_domains))
}

/// Count label shown above the list.
pub fn source_count_label(count: usize) -> String {
	format!("{count} source{}", if count == 1 { "" } else { "s" })
}
