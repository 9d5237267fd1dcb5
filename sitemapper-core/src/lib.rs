use colored::Colorize;

pub mod crawl;
pub mod report;

pub fn print_banner() {
    let banner = r#"
   ___ _ _                                      
  / __(_) |_ ___ _ __  __ _ _ __ _ __  ___ _ _ 
  \__ \ |  _/ -_) '  \/ _` | '_ \ '_ \/ -_) '_|
  |___/_|\__\___|_|_|_\__,_| .__/ .__/\___|_|  
                           |_|  |_|            
"#;
    eprintln!("{}", banner.bright_cyan());
    eprintln!(
        "  {} {}\n",
        "same-origin sitemap crawler".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
}
