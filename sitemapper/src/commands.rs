use crate::CLAP_STYLING;
use clap::arg;
use url::Url;

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("sitemapper")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sitemapper")
        .about("Crawl a website from a root URL and print its same-origin sitemap")
        .styles(CLAP_STYLING)
        .arg(
            arg!(<URL>)
                .help("Absolute http(s) URL to start crawling from")
                .value_parser(parse_root_url),
        )
        .arg(
            arg!(-d --"depth" <DEPTH>)
                .required(false)
                .help("Maximum number of link hops from the root")
                .value_parser(clap::value_parser!(i64))
                .allow_negative_numbers(true)
                .default_value("10"),
        )
        .arg(
            arg!(-w --"workers" <COUNT>)
                .required(false)
                .help("Maximum number of pages fetched concurrently")
                .value_parser(clap::value_parser!(usize))
                .default_value("100"),
        )
        .arg(
            arg!(-q --"queue" <CAPACITY>)
                .required(false)
                .help("Capacity of the pending-page queue")
                .value_parser(clap::value_parser!(usize))
                .default_value("100000"),
        )
        .arg(
            arg!(--"timeout" <SECONDS>)
                .required(false)
                .help("Per-request timeout in seconds")
                .value_parser(clap::value_parser!(u64))
                .default_value("10"),
        )
        .arg(
            arg!(--"strict-origin")
                .help("Only follow links with the same scheme, host and port as the root")
                .required(false),
        )
        .arg(
            arg!(-f --"format" <FORMAT>)
                .required(false)
                .help("Sitemap output format")
                .value_parser(["text", "json"])
                .default_value("text"),
        )
        .arg(
            arg!(-o --"output" <PATH>)
                .required(false)
                .help("Write the sitemap to a file instead of stdout"),
        )
        .arg(arg!(--"quiet" "Suppress banner, progress and summary output").required(false))
        .arg(arg!(-v --"verbose" "Enable debug logging").required(false))
}

/// Accepts only absolute http(s) URLs with a host.
fn parse_root_url(value: &str) -> Result<Url, String> {
    let url = Url::parse(value).map_err(|e| format!("'{}' is not an absolute URL: {}", value, e))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(format!("'{}' must be an http or https URL with a host", value)),
    }
}
