fn main() {
    if let Err(err) = vlan_topology::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
