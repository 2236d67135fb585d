use kube::CustomResourceExt as _;
use starknet_rpc::api::v1alpha1::StarknetRPC;

fn main() {
    match serde_yaml::to_string(&StarknetRPC::crd()) {
        Ok(yaml) => print!("{yaml}"),
        Err(e) => {
            eprintln!("failed to render the StarknetRPC CRD: {e}");
            std::process::exit(1);
        }
    }
}
