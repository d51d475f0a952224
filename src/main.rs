use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use shelf::assets::{
    get_image, resolve_image_path, AssetGlob, Error as AssetsError, ImageRef,
};
use shelf::config::{Config, Error as ConfigError};
use shelf::date::format_date;
use shelf::post::Post;
use shelf::query::{Blog, SortedPosts};
use shelf::slug::slugify;
use shelf::store::{DirectoryStore, Error as StoreError};
use shelf::taxonomy::TaxonomyEntryWithCount;
use std::fmt;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(&app().get_matches()) {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}

fn app() -> App<'static, 'static> {
    App::new("shelf")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Queries blog post metadata for a static content site")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("project")
                .long("project")
                .short("p")
                .takes_value(true)
                .value_name("DIR")
                .help(
                    "Directory to start searching for shelf.yaml from \
                     (defaults to the current directory)",
                ),
        )
        .subcommand(
            SubCommand::with_name("posts")
                .about("Lists published posts, most recent first")
                .arg(
                    Arg::with_name("limit")
                        .long("limit")
                        .takes_value(true)
                        .value_name("N")
                        .help("Return at most N posts"),
                )
                .arg(
                    Arg::with_name("featured")
                        .long("featured")
                        .conflicts_with_all(&["tag", "author"])
                        .help("Only list featured posts"),
                )
                .arg(
                    Arg::with_name("homepage-slider")
                        .long("homepage-slider")
                        .conflicts_with_all(&["tag", "author"])
                        .help("Only list posts marked for the homepage slider"),
                )
                .arg(
                    Arg::with_name("tag")
                        .long("tag")
                        .takes_value(true)
                        .conflicts_with("author")
                        .help("Only list posts with this tag (case-insensitive)"),
                )
                .arg(
                    Arg::with_name("author")
                        .long("author")
                        .takes_value(true)
                        .help("Only list posts by this author (case-insensitive)"),
                )
                .arg(
                    Arg::with_name("page")
                        .long("page")
                        .takes_value(true)
                        .value_name("N")
                        .help("Show page N (from 0) using the configured page size"),
                ),
        )
        .subcommand(SubCommand::with_name("tags").about("Lists tags with post counts"))
        .subcommand(SubCommand::with_name("topics").about("Same as `tags`"))
        .subcommand(SubCommand::with_name("authors").about("Lists authors with post counts"))
        .subcommand(
            SubCommand::with_name("slug")
                .about("Prints the slug for some text")
                .arg(Arg::with_name("TEXT").required(true)),
        )
        .subcommand(
            SubCommand::with_name("date")
                .about("Formats a date for display")
                .arg(Arg::with_name("DATE").required(true)),
        )
        .subcommand(
            SubCommand::with_name("image")
                .about("Resolves an image by name, or by path if NAME starts with `/`")
                .arg(Arg::with_name("NAME").required(true)),
        )
}

fn run(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        ("slug", Some(m)) => {
            println!("{}", slugify(m.value_of("TEXT").unwrap_or_default()));
            Ok(())
        }
        ("date", Some(m)) => {
            println!("{}", format_date(m.value_of("DATE").unwrap_or_default()));
            Ok(())
        }
        (name, Some(m)) => {
            let config = load_config(matches)?;
            match name {
                "posts" => posts(&config, m),
                "tags" | "topics" => taxonomy(&config, |blog| blog.tags_with_count()),
                "authors" => taxonomy(&config, |blog| blog.authors_with_count()),
                "image" => image(&config, m.value_of("NAME").unwrap_or_default()),
                _ => Ok(()),
            }
        }
        _ => Ok(()),
    }
}

fn load_config(matches: &ArgMatches) -> Result<Config> {
    let dir = match matches.value_of("project") {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir()?,
    };
    Ok(Config::from_directory(&dir)?)
}

fn posts(config: &Config, m: &ArgMatches) -> Result<()> {
    let store = DirectoryStore::new(&config.content_directory);
    let blog = Blog::new(&store, &config.collection);
    let limit = usize_arg(m, "limit")?;

    let result = if let Some(tag) = m.value_of("tag") {
        blog.posts_by_tag(Some(tag), limit)?
    } else if let Some(author) = m.value_of("author") {
        blog.posts_by_author(Some(author), limit)?
    } else {
        blog.sorted_posts(SortedPosts {
            limit,
            featured: m.is_present("featured"),
            homepage_slider: m.is_present("homepage-slider"),
        })?
    };

    match usize_arg(m, "page")? {
        None => {
            print_posts(&result.posts);
            println!("({} of {} posts)", result.posts.len(), result.total_posts);
        }
        Some(n) => {
            let page = result
                .page(n, config.page_size)
                .ok_or(Error::PageOutOfRange(n))?;
            print_posts(page.posts);
            println!(
                "(page {} of {}, {} posts)",
                page.page + 1,
                page.total_pages,
                result.total_posts
            );
        }
    }
    Ok(())
}

fn print_posts(posts: &[Post]) {
    for post in posts {
        println!("{:<13} {:<24} {}", format_date(post.pub_date), post.id, post.title);
    }
}

fn taxonomy<F>(config: &Config, f: F) -> Result<()>
where
    F: Fn(
        &Blog<'_, DirectoryStore>,
    ) -> std::result::Result<Vec<TaxonomyEntryWithCount>, StoreError>,
{
    let store = DirectoryStore::new(&config.content_directory);
    for entry in f(&Blog::new(&store, &config.collection))? {
        println!("{:>4}  {} ({})", entry.count, entry.original, entry.slug);
    }
    Ok(())
}

fn image(config: &Config, name: &str) -> Result<()> {
    let glob = AssetGlob::load(
        &config.assets_directory,
        &config.assets_key_prefix,
        &config.assets_url,
    )?;
    let asset = match name.starts_with('/') {
        true => resolve_image_path(ImageRef::Path(name.to_owned()), &glob, &config.site_root),
        false => get_image(name, "", &glob).cloned(),
    };
    match asset {
        Some(asset) => {
            println!("{}\t{}", asset.src, asset.path.display());
            Ok(())
        }
        None => Err(Error::ImageNotFound(name.to_owned())),
    }
}

fn usize_arg(m: &ArgMatches, name: &str) -> Result<Option<usize>> {
    match m.value_of(name) {
        None => Ok(None),
        Some(value) => value.parse().map(Some).map_err(|_| Error::InvalidArgument {
            name: name.to_owned(),
            value: value.to_owned(),
        }),
    }
}

type Result<T> = std::result::Result<T, Error>;

/// Everything that can stop a command.
#[derive(Debug)]
enum Error {
    Config(ConfigError),
    Store(StoreError),
    Assets(AssetsError),
    Io(std::io::Error),
    InvalidArgument { name: String, value: String },
    PageOutOfRange(usize),
    ImageNotFound(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Config(err) => write!(f, "{}", err),
            Error::Store(err) => write!(f, "{}", err),
            Error::Assets(err) => write!(f, "{}", err),
            Error::Io(err) => write!(f, "{}", err),
            Error::InvalidArgument { name, value } => {
                write!(f, "Invalid value for `--{}`: {:?}", name, value)
            }
            Error::PageOutOfRange(page) => write!(f, "No page {}", page),
            Error::ImageNotFound(name) => write!(f, "No image matching `{}`", name),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Config(err) => Some(err),
            Error::Store(err) => Some(err),
            Error::Assets(err) => Some(err),
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Error {
        Error::Config(err)
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Error {
        Error::Store(err)
    }
}

impl From<AssetsError> for Error {
    fn from(err: AssetsError) -> Error {
        Error::Assets(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}
