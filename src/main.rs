fn main() -> anyhow::Result<()> {
    facesentiment_lib::run()
}
