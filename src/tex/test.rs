use std::fs;
use std::path::Path;
use std::process::Command;
use anyhow::{anyhow, Result};
use super::{process, Config, Summary};

#[tokio::test]
async fn argument_files() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let aux = dir.path().join("paper.aux");

    fs::write(&aux, [
        r"\relax",
        r"\@texgit@needsTexgitPass",
        r"\@texgit@argFile{my_data}{}{.txt}",
        r"\@texgit@argFile{plot}{fig}{}",
    ].join("\n"))?;

    let config  = Config::default();
    let summary = process(&dir.path().join("paper"), &config).await?;
    assert_eq!(Summary { resolved: 2, deleted: 1, appended: 6 }, summary);

    let text  = fs::read_to_string(&aux)?;
    let lines = text.lines().collect::<Vec<_>>();

    assert_eq!(9, lines.len());
    assert!(text.ends_with('\n'));
    assert!(!text.contains("needsTexgitPass"));
    assert_eq!(r"\relax", lines[0]);
    assert_eq!(r"\expandafter\xdef\csname @texgit@path@my_data\endcsname{__git__/realms/args/my_data.txt}%", lines[3]);
    assert_eq!(r"\expandafter\xdef\csname @texgit@name@my_data\endcsname{my_data.txt}%", lines[4]);
    assert_eq!(r"\expandafter\gdef\csname @texgit@escName@my_data\endcsname{my\_data.txt}%", lines[5]);
    assert_eq!(r"\expandafter\xdef\csname @texgit@path@plot\endcsname{__git__/realms/args/fig}%", lines[6]);

    assert!(dir.path().join("__git__/realms/args/fig").is_file());
    assert!(dir.path().join("__git__/.cache.json").is_file());

    let summary = process(&aux, &config).await?;
    assert_eq!(Summary { resolved: 2, deleted: 0, appended: 0 }, summary);
    assert_eq!(text, fs::read_to_string(&aux)?);

    Ok(())
}

#[tokio::test]
async fn untouched() -> Result<()> {
    let dir    = tempfile::tempdir()?;
    let aux    = dir.path().join("plain.aux");
    let config = Config::default();

    fs::write(&aux, "\\relax\r\n\\bibstyle{plain}")?;
    assert_eq!(Summary::default(), process(&aux, &config).await?);
    assert_eq!("\\relax\r\n\\bibstyle{plain}", fs::read_to_string(&aux)?);
    assert!(!dir.path().join("__git__").exists());

    fs::write(&aux, "  \n")?;
    assert_eq!(Summary::default(), process(&aux, &config).await?);

    assert!(process(&dir.path().join("missing"), &config).await.is_err());

    Ok(())
}

#[tokio::test]
async fn invalid_request() -> Result<()> {
    let dir    = tempfile::tempdir()?;
    let aux    = dir.path().join("broken.aux");
    let text   = "\\@texgit@needsTexgitPass\n\\@texgit@argFile{a b}\n";
    let config = Config::default();

    fs::write(&aux, text)?;
    assert!(process(&aux, &config).await.is_err());
    assert_eq!(text, fs::read_to_string(&aux)?);

    fs::write(&aux, "\\@texgit@process{x}{}{}{false}\n")?;
    assert!(process(&aux, &config).await.is_err());

    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn process_output() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let aux = dir.path().join("run.aux");

    let mut config = Config::default();
    config.repo_dir = "cache".into();

    fs::write(&aux, "\\@texgit@process{greet}{}{}{echo hello\\ world}\n")?;

    let summary = process(&aux, &config).await?;
    assert_eq!(Summary { resolved: 1, deleted: 0, appended: 1 }, summary);

    let text = fs::read_to_string(&aux)?;
    assert!(text.ends_with("\\expandafter\\xdef\\csname @texgit@path@greet\\endcsname{cache/realms/output/greet}%\n"));
    assert_eq!("hello world\n", fs::read_to_string(dir.path().join("cache/realms/output/greet"))?);

    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn git_file() -> Result<()> {
    if Command::new("git").arg("--version").output().is_err() {
        return Ok(());
    }

    let origin = tempfile::tempdir()?;
    fs::write(origin.path().join("code.py"), "print(2)\nprint(1)\n")?;
    git(origin.path(), &["init", "-q"])?;
    git(origin.path(), &["add", "."])?;
    git(origin.path(), &["-c", "user.name=texgit", "-c", "user.email=texgit@example.com", "commit", "-q", "-m", "init"])?;

    let url = url::Url::from_directory_path(origin.path().canonicalize()?).map_err(|_| anyhow!("invalid path"))?;
    let url = url.as_str().trim_end_matches('/');

    let dir = tempfile::tempdir()?;
    let aux = dir.path().join("doc.aux");
    fs::write(&aux, format!("\\@texgit@gitFile{{plain}}{{{0}}}{{code.py}}{{}}\n\\@texgit@gitFile{{sorted}}{{{0}}}{{code.py}}{{sort}}\n", url))?;

    let summary = process(&aux, &Config::default()).await?;
    assert_eq!(Summary { resolved: 2, deleted: 0, appended: 8 }, summary);

    let text = fs::read_to_string(&aux)?;
    let name = r"\expandafter\xdef\csname @texgit@name@sorted\endcsname{code.py}%";
    let link = format!(r"\expandafter\xdef\csname @texgit@url@sorted\endcsname{{{}/code.py}}%", url);
    assert!(text.contains(name));
    assert!(text.contains(&link));
    assert!(text.contains(r"\expandafter\gdef\csname @texgit@escName@plain\endcsname{code.py}%"));
    assert!(text.contains(r"{__git__/realms/postprocessed/sorted}%"));

    let sorted = dir.path().join("__git__/realms/postprocessed/sorted");
    assert_eq!("print(1)\nprint(2)\n", fs::read_to_string(sorted)?);

    Ok(())
}

fn git(dir: &Path, args: &[&str]) -> Result<()> {
    let status = Command::new("git").arg("-C").arg(dir).args(args).status()?;
    match status.success() {
        true  => Ok(()),
        false => Err(anyhow!("git {:?} failed with {}", args, status)),
    }
}
