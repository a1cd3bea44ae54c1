use mockfs_kit::{Binding, Config, MockFS, OpenFlags, Options, directory, file, symlink};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // RUST_LOG=mockfs_kit=debug shows every mutation of the tree
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // describes the initial tree: `/docs/first.txt`, an empty `/tmp` and a link to `/docs`
    let config = Config::new()
        .entry("/docs/first.txt", "Hello")
        .entry("/tmp", directory().mode(0o1777))
        .entry("/latest", symlink("/docs"))
        .entry("/readonly.txt", file().content("locked").mode(0o444));

    // nothing here touches the host file system
    let mut fs = MockFS::create(config, &Options::bare())?;

    // change the virtual CWD through the symbolic link; it is stored canonicalized
    fs.chdir("/latest")?;
    println!("cwd: {}", fs.cwd());

    // relative paths resolve against the CWD
    fs.write_file("second.txt", b"World")?;
    assert!(fs.exists("/docs/second.txt"));

    let first = fs.read_file("first.txt")?;
    let second = fs.read_file("/docs/second.txt")?;
    println!(
        "{}, {}!",
        String::from_utf8_lossy(&first),
        String::from_utf8_lossy(&second)
    );

    // failures look like their POSIX counterparts
    if let Err(err) = fs.open("/readonly.txt", OpenFlags::write_only(), 0o644) {
        println!("{err}");
    }
    if let Err(err) = fs.rmdir("/docs") {
        println!("{err}");
    }

    // descriptors are small integers starting at 3
    let fd = fs.open("/tmp/log", OpenFlags::append_only(), 0o600)?;
    fs.write(fd, b"one\n")?;
    fs.write(fd, b"two\n")?;
    println!("fd {fd}: {} bytes", fs.fstat(fd)?.size);
    fs.close(fd)?;

    // inspect the final tree
    for entry in fs.readdir_with_types("/")? {
        println!("/{} ({:?})", entry.name(), entry.kind());
    }
    Ok(())
}
