//! Git transport: cloning template sources and publishing generated projects.

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{
    AutotagOption, Cred, FetchOptions, IndexAddOption, PushOptions, RemoteCallbacks, Repository,
    Signature,
};
use log::debug;
use std::cell::Cell;
use std::path::{Path, PathBuf};

use crate::constants::CHECKOUT_PREFIX;
use crate::error::{Error, Result};
use crate::provider::Checkout;

/// Account used for git transport authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub secret: String,
}

/// Plain-text credential callbacks. Credentials are offered once; a second
/// request means they were rejected and the operation fails instead of looping.
fn callbacks<'a>(credentials: &'a Credentials, attempts: &'a Cell<u32>) -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |url, _username_from_url, _allowed_types| {
        attempts.set(attempts.get() + 1);
        if attempts.get() > 1 {
            return Err(git2::Error::from_str(&format!("credentials rejected by {url}")));
        }
        Cred::userpass_plaintext(&credentials.username, &credentials.secret)
    });
    callbacks
}

/// Creates a fresh, uniquely named directory for one checkout.
/// The directory outlives this call; removing it is up to the caller.
pub fn checkout_dir() -> Result<PathBuf> {
    let dir = tempfile::Builder::new().prefix(CHECKOUT_PREFIX).tempdir()?;
    Ok(dir.keep())
}

/// Clones `url` into `dir` at the requested branch or tag.
pub fn clone(url: &str, dir: &Path, checkout: &Checkout, credentials: &Credentials) -> Result<Repository> {
    debug!("Cloning '{}' ({}) to '{}'.", url, checkout, dir.display());

    let attempts = Cell::new(0);
    let mut fetch_opts = FetchOptions::new();
    fetch_opts.remote_callbacks(callbacks(credentials, &attempts));
    if matches!(checkout, Checkout::Tag(_)) {
        fetch_opts.download_tags(AutotagOption::All);
    }

    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch_opts);
    if let Checkout::Branch(branch) = checkout {
        builder.branch(branch);
    }

    let repository = builder.clone(url, dir)?;

    if let Checkout::Tag(tag) = checkout {
        checkout_tag(&repository, tag)?;
    }
    Ok(repository)
}

fn checkout_tag(repository: &Repository, tag: &str) -> Result<()> {
    let object = repository
        .revparse_single(&format!("refs/tags/{tag}"))
        .map_err(|_| Error::RepositoryNotFoundError { name: format!("tag {tag}") })?;
    let commit = object.peel_to_commit()?;

    repository.checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().force()))?;
    repository.set_head_detached(commit.id())?;
    Ok(())
}

/// Initializes a repository in `dir` and commits every file in it.
pub fn commit_all(dir: &Path, author: &str, email: &str, message: &str) -> Result<Repository> {
    let repository = Repository::init(dir)?;
    {
        let mut index = repository.index()?;
        index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
        index.write()?;
        let tree = repository.find_tree(index.write_tree()?)?;
        let signature = Signature::now(author, email)?;
        let commit = repository.commit(Some("HEAD"), &signature, &signature, message, &tree, &[])?;
        debug!("Created commit {} in '{}'.", commit, dir.display());
    }
    Ok(repository)
}

/// Pushes the current branch of `repository` to `url`.
pub fn push(repository: &Repository, remote_name: &str, url: &str, credentials: &Credentials) -> Result<()> {
    let head = repository.head()?;
    let reference = head
        .name()
        .ok_or_else(|| git2::Error::from_str("HEAD is not a valid UTF-8 reference"))?;
    let refspec = format!("{reference}:{reference}");
    debug!("Pushing '{}' to '{}'.", refspec, url);

    let mut remote = repository.remote(remote_name, url)?;
    let attempts = Cell::new(0);
    let mut push_opts = PushOptions::new();
    push_opts.remote_callbacks(callbacks(credentials, &attempts));
    remote.push(&[refspec.as_str()], Some(&mut push_opts))?;
    Ok(())
}
